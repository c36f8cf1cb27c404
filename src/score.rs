//! Point ledger, persisted as a CSV grid.
//!
//! Column 0 holds row labels, every other column belongs to one user.
//! Row 0 is user ids, row 1 display names, row 2 running totals, and each
//! following row is one calendar date. The last row is always today.

use std::path::{Path, PathBuf};

use chrono::{Days, Local, NaiveDate};
use tokio::sync::RwLock;
use tracing::info;

use crate::persist::{self, PersistError};
use crate::types::UserId;

const DATE_FORMAT: &str = "%m/%d/%Y";

const ROW_IDS: usize = 0;
const ROW_NAMES: usize = 1;
const ROW_TOTALS: usize = 2;
const FIRST_DATE_ROW: usize = 3;

fn escape_field(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn render_csv(rows: &[Vec<String>]) -> String {
    let mut out = String::new();
    for row in rows {
        let line = row.iter().map(|f| escape_field(f)).collect::<Vec<_>>().join(",");
        out.push_str(&line);
        out.push('\n');
    }
    out
}

fn parse_csv(text: &str) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    let mut row = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = false,
                _ => field.push(c),
            }
        } else {
            match c {
                '"' => in_quotes = true,
                ',' => row.push(std::mem::take(&mut field)),
                '\r' => {}
                '\n' => {
                    row.push(std::mem::take(&mut field));
                    rows.push(std::mem::take(&mut row));
                }
                _ => field.push(c),
            }
        }
    }
    if !field.is_empty() || !row.is_empty() {
        row.push(field);
        rows.push(row);
    }
    rows
}

fn default_sheet(today: NaiveDate) -> Vec<Vec<String>> {
    vec![
        vec!["user_id".to_string()],
        vec!["name".to_string()],
        vec!["total".to_string()],
        vec![today.format(DATE_FORMAT).to_string()],
    ]
}

/// Append missing date rows so the last row is today. Each new row starts
/// everyone at zero.
fn catch_up(data: &mut Vec<Vec<String>>, today: NaiveDate) -> bool {
    let width = data[ROW_IDS].len();
    let last = data
        .last()
        .and_then(|row| row.first())
        .and_then(|label| NaiveDate::parse_from_str(label, DATE_FORMAT).ok());
    let mut date = match last {
        Some(d) => d,
        None => return false,
    };
    let mut changed = false;
    while date < today {
        date = match date.checked_add_days(Days::new(1)) {
            Some(d) => d,
            None => break,
        };
        let mut row = vec![date.format(DATE_FORMAT).to_string()];
        row.resize(width, "0".to_string());
        data.push(row);
        changed = true;
    }
    changed
}

fn parse_score(field: &str) -> i64 {
    field.trim().parse().unwrap_or(0)
}

/// Per-user point ledger backed by a CSV sheet.
pub struct ScoreKeeper {
    data: RwLock<Vec<Vec<String>>>,
    path: PathBuf,
}

impl ScoreKeeper {
    pub fn load(data_dir: &Path) -> Result<Self, PersistError> {
        Self::load_with_today(data_dir, Local::now().date_naive())
    }

    fn load_with_today(data_dir: &Path, today: NaiveDate) -> Result<Self, PersistError> {
        let path = data_dir.join("scores.csv");
        let default = render_csv(&default_sheet(today));
        let text = persist::load_text_or_init(&path, &default)?;
        let mut data = parse_csv(&text);
        if data.len() < FIRST_DATE_ROW + 1 {
            data = default_sheet(today);
        }
        if catch_up(&mut data, today) {
            info!(path = %path.display(), "score sheet caught up to today");
            persist::write_text(&path, &render_csv(&data))?;
        }
        Ok(Self {
            data: RwLock::new(data),
            path,
        })
    }

    fn save(&self, data: &[Vec<String>]) -> Result<(), PersistError> {
        persist::write_text(&self.path, &render_csv(data))
    }

    fn column_of(data: &[Vec<String>], user: &str) -> Option<usize> {
        data[ROW_IDS].iter().skip(1).position(|u| u == user).map(|i| i + 1)
    }

    pub async fn user_exists(&self, user: &str) -> bool {
        Self::column_of(&self.data.read().await, user).is_some()
    }

    /// Register a user with zeroed scores in every row.
    pub async fn add_new_user(&self, user: &str) -> Result<(), PersistError> {
        let mut data = self.data.write().await;
        if Self::column_of(&data, user).is_some() {
            return Ok(());
        }
        data[ROW_IDS].push(user.to_string());
        data[ROW_NAMES].push(String::new());
        data[ROW_TOTALS].push("0".to_string());
        for row in data.iter_mut().skip(FIRST_DATE_ROW) {
            row.push("0".to_string());
        }
        info!(user, "score sheet user added");
        self.save(&data)
    }

    pub async fn add_name_to_user(&self, user: &str, name: &str) -> Result<(), PersistError> {
        let mut data = self.data.write().await;
        if let Some(col) = Self::column_of(&data, user) {
            if data[ROW_NAMES][col] != name {
                data[ROW_NAMES][col] = name.to_string();
                self.save(&data)?;
            }
        }
        Ok(())
    }

    pub async fn get_user_name(&self, user: &str) -> Option<String> {
        let data = self.data.read().await;
        let col = Self::column_of(&data, user)?;
        let name = &data[ROW_NAMES][col];
        if name.is_empty() {
            None
        } else {
            Some(name.clone())
        }
    }

    pub async fn add_user_point(&self, user: &str) -> Result<(), PersistError> {
        self.add_user_points(user, 1).await
    }

    /// Add points (negative allowed) to the user's today row and running
    /// total. Unknown users are registered first.
    pub async fn add_user_points(&self, user: &str, points: i64) -> Result<(), PersistError> {
        let mut data = self.data.write().await;
        if Self::column_of(&data, user).is_none() {
            data[ROW_IDS].push(user.to_string());
            data[ROW_NAMES].push(String::new());
            data[ROW_TOTALS].push("0".to_string());
            for row in data.iter_mut().skip(FIRST_DATE_ROW) {
                row.push("0".to_string());
            }
        }
        catch_up(&mut data, Local::now().date_naive());
        let col = match Self::column_of(&data, user) {
            Some(c) => c,
            None => return Ok(()),
        };
        let last = data.len() - 1;
        let today = parse_score(&data[last][col]) + points;
        data[last][col] = today.to_string();
        let total = parse_score(&data[ROW_TOTALS][col]) + points;
        data[ROW_TOTALS][col] = total.to_string();
        self.save(&data)
    }

    fn scores_from_row(data: &[Vec<String>], row: usize) -> Vec<(UserId, String, i64)> {
        let mut out = Vec::new();
        for col in 1..data[ROW_IDS].len() {
            out.push((
                data[ROW_IDS][col].clone(),
                data[ROW_NAMES][col].clone(),
                parse_score(&data[row][col]),
            ));
        }
        out
    }

    /// Today's scores in sheet column order.
    pub async fn get_today_scores(&self) -> Vec<(UserId, String, i64)> {
        let data = self.data.read().await;
        Self::scores_from_row(&data, data.len() - 1)
    }

    /// Running totals in sheet column order.
    pub async fn get_total_scores(&self) -> Vec<(UserId, String, i64)> {
        let data = self.data.read().await;
        Self::scores_from_row(&data, ROW_TOTALS)
    }

    pub async fn get_today_scores_ranked(&self) -> Vec<(UserId, String, i64)> {
        let mut scores = self.get_today_scores().await;
        scores.sort_by(|a, b| b.2.cmp(&a.2));
        scores
    }

    pub async fn get_total_scores_ranked(&self) -> Vec<(UserId, String, i64)> {
        let mut scores = self.get_total_scores().await;
        scores.sort_by(|a, b| b.2.cmp(&a.2));
        scores
    }

    /// The user's `(today, total)` pair, when they are on the sheet.
    pub async fn get_user_scores(&self, user: &str) -> Option<(i64, i64)> {
        let data = self.data.read().await;
        let col = Self::column_of(&data, user)?;
        let last = data.len() - 1;
        Some((parse_score(&data[last][col]), parse_score(&data[ROW_TOTALS][col])))
    }
}

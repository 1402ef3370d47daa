use chrono::{DateTime, Datelike, NaiveDate};
use serde::Deserialize;
use storage::models::GameMode;

#[derive(Debug, Deserialize, Clone)]
pub struct ArchivesResponse {
    pub archives: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MonthlyGames {
    #[serde(default)]
    pub games: Vec<Game>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Game {
    pub white: GamePlayer,
    pub black: GamePlayer,
    pub time_class: String,
    pub end_time: i64,
    #[serde(default = "standard_rules")]
    pub rules: String,
}

fn standard_rules() -> String {
    "chess".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct GamePlayer {
    pub username: String,
    #[serde(default)]
    pub rating: Option<i32>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct PlayerStats {
    #[serde(default)]
    pub chess_blitz: Option<ModeStats>,
    #[serde(default)]
    pub chess_rapid: Option<ModeStats>,
    #[serde(default)]
    pub chess_bullet: Option<ModeStats>,
    #[serde(default)]
    pub chess_daily: Option<ModeStats>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ModeStats {
    #[serde(default)]
    pub last: Option<LastRating>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LastRating {
    pub rating: i32,
}

impl PlayerStats {
    pub fn rating_for(&self, game_mode: GameMode) -> Option<i32> {
        let stats = match game_mode {
            GameMode::Blitz => &self.chess_blitz,
            GameMode::Rapid => &self.chess_rapid,
            GameMode::Bullet => &self.chess_bullet,
            GameMode::Daily => &self.chess_daily,
        };
        stats.as_ref()?.last.as_ref().map(|last| last.rating)
    }
}

impl Game {
    fn ended_on(&self) -> Option<NaiveDate> {
        DateTime::from_timestamp(self.end_time, 0).map(|at| at.date_naive())
    }

    /// The side that is not `handle`, compared case-insensitively.
    fn opponent_of(&self, handle: &str) -> Option<&str> {
        if self.white.username.eq_ignore_ascii_case(handle) {
            Some(&self.black.username)
        } else if self.black.username.eq_ignore_ascii_case(handle) {
            Some(&self.white.username)
        } else {
            None
        }
    }
}

/// `(year, month)` of a monthly archive URL such as `.../games/2024/03`.
pub fn archive_month(url: &str) -> Option<(i32, u32)> {
    let mut segments = url.trim_end_matches('/').rsplit('/');
    let month = segments.next()?.parse::<u32>().ok()?;
    let year = segments.next()?.parse::<i32>().ok()?;
    (1..=12).contains(&month).then_some((year, month))
}

/// Whether a monthly archive can hold games ending on or before `end_date`.
pub fn month_within(month: (i32, u32), end_date: NaiveDate) -> bool {
    month <= (end_date.year(), end_date.month())
}

/// Lowercased opponents of `handle` across standard games of `game_mode`
/// that ended on or before `end_date`. May contain duplicates.
pub fn opponents_in<'a>(
    games: &'a [Game],
    handle: &'a str,
    game_mode: GameMode,
    end_date: NaiveDate,
) -> impl Iterator<Item = String> + 'a {
    games
        .iter()
        .filter(move |game| game.rules == "chess" && game.time_class == game_mode.as_str())
        .filter(move |game| game.ended_on().is_some_and(|day| day <= end_date))
        .filter_map(move |game| game.opponent_of(handle))
        .map(str::to_lowercase)
}

//! Ministry source: a Hijri-month HTML table keyed by a numeric city id.
//!
//! The page is untrusted and changes shape without notice, so the parser
//! reads rows defensively: the last six cells are the times, the cell
//! before them the Gregorian date, the one before that the Hijri day.
//! Anything that does not fit is skipped rather than guessed at.

use chrono::{Datelike, NaiveDate};
use scraper::{Html, Selector};
use std::time::Duration;
use url::Url;

use crate::config::SourceConfig;
use crate::error::SourceError;
use crate::types::{to_ascii_digits, DayTimes, HijriDay, ParsedDay, ParsedMonth};

/// Minimum cells in a data row: Hijri day, date, six times.
const MIN_ROW_CELLS: usize = 8;

/// Build the Ministry URL for a city.
pub fn month_url(config: &SourceConfig, city_id: u32) -> Result<Url, SourceError> {
    let mut url = Url::parse(&config.ministry_url)
        .map_err(|e| SourceError::Config(format!("invalid ministry_url: {e}")))?;
    url.query_pairs_mut()
        .append_pair("ville", &city_id.to_string());
    Ok(url)
}

/// Fetch the month page for `city_id` and parse it off the calling task.
///
/// Parsing runs on the blocking pool so a slow parse never eats into the
/// caller's time budget.
pub async fn fetch_month(
    client: &reqwest::Client,
    config: &SourceConfig,
    city_id: u32,
    today: NaiveDate,
) -> Result<ParsedMonth, SourceError> {
    let url = month_url(config, city_id)?;
    let html = crate::http::get_text(
        client,
        url,
        Duration::from_secs(config.timeout_seconds),
        "ministry request",
    )
    .await?;

    tracing::debug!(city_id, bytes = html.len(), "ministry page received");

    tokio::task::spawn_blocking(move || parse_ministry_html(&html, today))
        .await
        .map_err(|e| SourceError::Parse(format!("ministry parser task failed: {e}")))?
}

/// Parse a Ministry month page into structured days.
///
/// `today` anchors year inference for `dd/mm` dates.
///
/// # Errors
///
/// Returns [`SourceError::Parse`] when no table rows can be read or no row
/// carries a usable Fajr and Isha.
pub fn parse_ministry_html(html: &str, today: NaiveDate) -> Result<ParsedMonth, SourceError> {
    let document = Html::parse_document(html);

    let row_sel = Selector::parse("table tr")
        .map_err(|e| SourceError::Parse(format!("invalid row selector: {e:?}")))?;
    let cell_sel = Selector::parse("td")
        .map_err(|e| SourceError::Parse(format!("invalid cell selector: {e:?}")))?;
    let caption_sel = Selector::parse("table caption, .month-title")
        .map_err(|e| SourceError::Parse(format!("invalid caption selector: {e:?}")))?;

    let mut days = Vec::new();
    for row in document.select(&row_sel) {
        let cells: Vec<String> = row
            .select(&cell_sel)
            .map(|cell| cell.text().collect::<String>().trim().to_string())
            .collect();
        if let Some(day) = parse_row(&cells, today) {
            days.push(day);
        }
    }

    if days.is_empty() {
        return Err(SourceError::Parse("no prayer rows in ministry page".into()));
    }
    if !days.iter().any(|d| d.times.is_valid()) {
        return Err(SourceError::Parse(
            "ministry page has no row with both fajr and isha".into(),
        ));
    }

    let (month_label_latin, month_label_arabic) = document
        .select(&caption_sel)
        .next()
        .map(|el| split_month_labels(&el.text().collect::<String>()))
        .unwrap_or((None, None));

    let expires_at = if days.iter().all(|d| d.date.is_some()) {
        days.iter().filter_map(|d| d.date).max()
    } else {
        None
    };

    tracing::debug!(count = days.len(), ?expires_at, "ministry rows parsed");

    Ok(ParsedMonth {
        month_label_latin,
        month_label_arabic,
        days,
        expires_at,
    })
}

fn parse_row(cells: &[String], today: NaiveDate) -> Option<ParsedDay> {
    if cells.len() < MIN_ROW_CELLS {
        return None;
    }
    let times_start = cells.len() - 6;
    let times = DayTimes::from_raw([
        cells[times_start].as_str(),
        cells[times_start + 1].as_str(),
        cells[times_start + 2].as_str(),
        cells[times_start + 3].as_str(),
        cells[times_start + 4].as_str(),
        cells[times_start + 5].as_str(),
    ]);

    let date = parse_row_date(&cells[times_start - 1], today);
    let hijri_raw = cells[times_start - 2].as_str();
    let hijri_day = match HijriDay::parse(hijri_raw) {
        Some(day) => day,
        // A non-numeric marker in the day column is the moon-sighting row,
        // unless no time parsed, which is how a header row built from `td`
        // cells looks.
        None if !hijri_raw.is_empty()
            && !hijri_raw.chars().any(|c| c.is_ascii_digit())
            && times != DayTimes::unavailable() =>
        {
            HijriDay::MoonSighting
        }
        None => return None,
    };

    Some(ParsedDay {
        hijri_day,
        date,
        times,
    })
}

/// Parse `dd/mm`, `dd/mm/yyyy`, `dd-mm-yyyy` or ISO `yyyy-mm-dd`.
///
/// Year-less dates take the year that puts them closest to `today`, which
/// handles months that straddle new year.
fn parse_row_date(raw: &str, today: NaiveDate) -> Option<NaiveDate> {
    let ascii = to_ascii_digits(raw.trim());
    if let Ok(date) = NaiveDate::parse_from_str(&ascii, "%Y-%m-%d") {
        return Some(date);
    }
    let parts: Vec<&str> = ascii.split(['/', '-', '.']).collect();
    let day: u32 = parts.first()?.trim().parse().ok()?;
    let month: u32 = parts.get(1)?.trim().parse().ok()?;
    match parts.get(2) {
        Some(year) => NaiveDate::from_ymd_opt(year.trim().parse().ok()?, month, day),
        None => [today.year() - 1, today.year(), today.year() + 1]
            .into_iter()
            .filter_map(|y| NaiveDate::from_ymd_opt(y, month, day))
            .min_by_key(|candidate| (*candidate - today).num_days().abs()),
    }
}

fn split_month_labels(caption: &str) -> (Option<String>, Option<String>) {
    let mut latin = None;
    let mut arabic = None;
    for part in caption.split(['/', '|']) {
        let part = part.split_whitespace().collect::<Vec<_>>().join(" ");
        if part.is_empty() {
            continue;
        }
        if part.chars().any(is_arabic_letter) {
            arabic.get_or_insert(part);
        } else {
            latin.get_or_insert(part);
        }
    }
    (latin, arabic)
}

fn is_arabic_letter(c: char) -> bool {
    matches!(c, '\u{0621}'..='\u{064A}')
}

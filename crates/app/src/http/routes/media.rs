use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::{Datelike, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::state::AppState;
use animehub_infra::anilist::{AnilistError, Media, Page, SearchParams, Season};

#[derive(Debug, Error)]
pub enum MediaApiError {
    #[error("unknown season: {0}")]
    UnknownSeason(String),
    #[error("catalog error: {0}")]
    Catalog(#[from] AnilistError),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub page: Option<i32>,
    #[serde(default)]
    pub per_page: Option<i32>,
    /// Comma-separated AniList sort keys, e.g. `SCORE_DESC,POPULARITY_DESC`.
    #[serde(default)]
    pub sort: Option<String>,
    #[serde(default)]
    pub genres: Option<String>,
    #[serde(default)]
    pub tags: Option<String>,
    #[serde(default)]
    pub season: Option<String>,
    #[serde(default)]
    pub season_year: Option<i32>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub is_adult: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct PagingQuery {
    #[serde(default)]
    pub page: Option<i32>,
    #[serde(default)]
    pub per_page: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct SeasonQuery {
    #[serde(default)]
    pub season: Option<String>,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub page: Option<i32>,
    #[serde(default)]
    pub per_page: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct DetailQuery {
    #[serde(default)]
    pub by_mal_id: Option<bool>,
}

pub async fn search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Page>, MediaApiError> {
    let season = query
        .season
        .as_deref()
        .map(parse_season)
        .transpose()?;
    let params = SearchParams {
        page: query.page,
        per_page: query.per_page,
        search: query.search.filter(|s| !s.trim().is_empty()),
        sort: split_list(query.sort.as_deref()),
        genres: split_list(query.genres.as_deref()),
        tags: split_list(query.tags.as_deref()),
        season,
        season_year: query.season_year,
        formats: split_list(query.format.as_deref()),
        statuses: split_list(query.status.as_deref()),
        sources: split_list(query.source.as_deref()),
        is_adult: query.is_adult.unwrap_or(false),
        ..SearchParams::default()
    };
    let page = state.catalog.search(&params).await?;
    Ok(Json(page))
}

pub async fn trending(
    State(state): State<AppState>,
    Query(query): Query<PagingQuery>,
) -> Result<Json<Page>, MediaApiError> {
    let page = state
        .catalog
        .trending(query.page.unwrap_or(1), query.per_page.unwrap_or(12))
        .await?;
    Ok(Json(page))
}

/// Defaults to the season the current date falls into.
pub async fn season(
    State(state): State<AppState>,
    Query(query): Query<SeasonQuery>,
) -> Result<Json<Page>, MediaApiError> {
    let now = Utc::now();
    let season = match query.season.as_deref() {
        Some(raw) => parse_season(raw)?,
        None => Season::for_month(now.month()),
    };
    let year = query.year.unwrap_or(now.year());
    let page = state
        .catalog
        .season(season, year, query.page.unwrap_or(1), query.per_page.unwrap_or(6))
        .await?;
    Ok(Json(page))
}

pub async fn media_detail(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(query): Query<DetailQuery>,
) -> Result<Json<Media>, MediaApiError> {
    let media = state
        .catalog
        .media_by_id(id, query.by_mal_id.unwrap_or(false))
        .await?;
    Ok(Json(media))
}

fn parse_season(raw: &str) -> Result<Season, MediaApiError> {
    match raw.trim().to_ascii_uppercase().as_str() {
        "WINTER" => Ok(Season::Winter),
        "SPRING" => Ok(Season::Spring),
        "SUMMER" => Ok(Season::Summer),
        "FALL" => Ok(Season::Fall),
        _ => Err(MediaApiError::UnknownSeason(raw.to_string())),
    }
}

fn split_list(raw: Option<&str>) -> Vec<String> {
    raw.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

impl IntoResponse for MediaApiError {
    fn into_response(self) -> axum::response::Response {
        warn!(error = %self, "media api error");
        let status = match &self {
            MediaApiError::UnknownSeason(_) => StatusCode::BAD_REQUEST,
            MediaApiError::Catalog(AnilistError::MissingData(_)) => StatusCode::NOT_FOUND,
            MediaApiError::Catalog(_) => StatusCode::BAD_GATEWAY,
        };
        let body = Json(ErrorBody {
            error: self.to_string(),
        });
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use animehub_infra::anilist::Season;

    use super::{parse_season, split_list};

    #[test]
    fn seasons_parse_case_insensitively() {
        assert_eq!(parse_season("fall").unwrap(), Season::Fall);
        assert_eq!(parse_season(" WINTER ").unwrap(), Season::Winter);
        assert!(parse_season("monsoon").is_err());
    }

    #[test]
    fn lists_split_on_commas_and_drop_blanks() {
        assert_eq!(
            split_list(Some("Action, Adventure ,,")),
            vec!["Action", "Adventure"]
        );
        assert!(split_list(None).is_empty());
    }
}

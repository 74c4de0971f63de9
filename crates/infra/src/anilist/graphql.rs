use serde::{Deserialize, Serialize};
use thiserror::Error;

const GRAPHQL_ENDPOINT: &str = "https://graphql.anilist.co";

const DEFAULT_PAGE: i32 = 1;
const DEFAULT_PER_PAGE: i32 = 24;
const DEFAULT_SORT: &str = "POPULARITY_DESC";

/// Fields shared by every media query.
const MEDIA_CORE_FIELDS: &str = r#"
    id
    idMal
    title { romaji english native userPreferred }
    format
    status
    description(asHtml: true)
    startDate { year month day }
    endDate { year month day }
    season
    seasonYear
    episodes
    duration
    countryOfOrigin
    source(version: 2)
    trailer { id site thumbnail }
    coverImage { large medium extraLarge color }
    bannerImage
    genres
    synonyms
    averageScore
    meanScore
    popularity
    favourites
    isAdult
    siteUrl
    studios(isMain: true) { edges { node { id name isAnimationStudio } } }
    tags { id name rank isMediaSpoiler }
    nextAiringEpisode { airingAt timeUntilAiring episode }
"#;

/// Extra fields for the single-media detail view.
const MEDIA_DETAIL_FIELDS: &str = r#"
    relations {
      edges {
        id
        relationType(version: 2)
        node { id title { userPreferred } format type status coverImage { medium } siteUrl }
      }
    }
    characters(sort: [ROLE, RELEVANCE, ID], perPage: 12, page: 1) {
      edges {
        id
        role
        node {
          id
          name { userPreferred native }
          image { large medium }
          siteUrl
          description(asHtml: false)
        }
        voiceActors(language: JAPANESE, sort: [RELEVANCE, ID]) {
          id
          name { userPreferred }
          image { medium }
          languageV2
          siteUrl
        }
      }
    }
    recommendations(sort: [RATING_DESC, ID], perPage: 8) {
      nodes {
        id
        rating
        mediaRecommendation {
          id title { userPreferred } format status coverImage { medium } averageScore siteUrl
        }
      }
    }
"#;

#[derive(Debug, Error)]
pub enum AnilistError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("graphql error: {0}")]
    Graphql(String),
    #[error("missing data: {0}")]
    MissingData(&'static str),
}

/// Read-only client for the AniList media catalog. The API is public; no
/// token handling is needed.
#[derive(Debug, Clone)]
pub struct AnilistClient {
    http: reqwest::Client,
}

impl AnilistClient {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }

    /// Fetches one media entry with the detail fragment. `by_mal_id` looks
    /// the entry up through its MyAnimeList id instead.
    pub async fn media_by_id(&self, id: i64, by_mal_id: bool) -> Result<Media, AnilistError> {
        let query = format!(
            "query ($mediaId: Int, $malId: Int, $type: MediaType) {{\
               Media(id: $mediaId, idMal: $malId, type: $type) {{ {MEDIA_CORE_FIELDS} {MEDIA_DETAIL_FIELDS} }}\
             }}"
        );
        let vars = MediaVars {
            media_id: (!by_mal_id).then_some(id),
            mal_id: by_mal_id.then_some(id),
            media_type: "ANIME",
        };
        let data: MediaResponse = self.graphql(&query, vars).await?;
        data.media.ok_or(AnilistError::MissingData("media"))
    }

    /// Paged catalog search with the core fragment.
    pub async fn search(&self, params: &SearchParams) -> Result<Page, AnilistError> {
        let query = format!(
            "query ($page: Int, $perPage: Int, $search: String, $sort: [MediaSort], \
                    $genre_in: [String], $tag_in: [String], $season: MediaSeason, \
                    $seasonYear: Int, $format_in: [MediaFormat], $status_in: [MediaStatus], \
                    $source_in: [MediaSource], $isAdult: Boolean, $id_in: [Int], \
                    $idMal_in: [Int], $type: MediaType) {{\
               Page(page: $page, perPage: $perPage) {{\
                 pageInfo {{ total perPage currentPage lastPage hasNextPage }}\
                 media(search: $search, type: $type, sort: $sort, genre_in: $genre_in, \
                       tag_in: $tag_in, season: $season, seasonYear: $seasonYear, \
                       format_in: $format_in, status_in: $status_in, source_in: $source_in, \
                       isAdult: $isAdult, id_in: $id_in, idMal_in: $idMal_in) {{ {MEDIA_CORE_FIELDS} }}\
               }}\
             }}"
        );
        let data: PageResponse = self.graphql(&query, params.to_vars()).await?;
        Ok(data.page)
    }

    /// Currently trending titles.
    pub async fn trending(&self, page: i32, per_page: i32) -> Result<Page, AnilistError> {
        self.search(&SearchParams {
            page: Some(page),
            per_page: Some(per_page),
            sort: vec!["TRENDING_DESC".to_string(), "POPULARITY_DESC".to_string()],
            ..SearchParams::default()
        })
        .await
    }

    /// Titles airing in one season.
    pub async fn season(
        &self,
        season: Season,
        year: i32,
        page: i32,
        per_page: i32,
    ) -> Result<Page, AnilistError> {
        self.search(&SearchParams {
            page: Some(page),
            per_page: Some(per_page),
            season: Some(season),
            season_year: Some(year),
            ..SearchParams::default()
        })
        .await
    }

    async fn graphql<T, V>(&self, query: &str, variables: V) -> Result<T, AnilistError>
    where
        T: for<'de> Deserialize<'de>,
        V: Serialize,
    {
        let response = self
            .http
            .post(GRAPHQL_ENDPOINT)
            .header("Accept", "application/json")
            .json(&GraphqlRequest { query, variables })
            .send()
            .await?;
        let payload: GraphqlResponse<T> = response.json().await?;
        if let Some(errors) = payload.errors {
            let message = errors
                .into_iter()
                .map(|err| err.message)
                .collect::<Vec<_>>()
                .join(", ");
            return Err(AnilistError::Graphql(message));
        }
        payload.data.ok_or(AnilistError::MissingData("graphql data"))
    }
}

/// Catalog search filters. Unset filters stay out of the GraphQL variables
/// entirely, which AniList treats as "no constraint".
#[derive(Debug, Clone, Default)]
pub struct SearchParams {
    pub page: Option<i32>,
    pub per_page: Option<i32>,
    pub search: Option<String>,
    pub sort: Vec<String>,
    pub genres: Vec<String>,
    pub tags: Vec<String>,
    pub season: Option<Season>,
    pub season_year: Option<i32>,
    pub formats: Vec<String>,
    pub statuses: Vec<String>,
    pub sources: Vec<String>,
    pub is_adult: bool,
    pub ids: Vec<i64>,
    pub mal_ids: Vec<i64>,
}

impl SearchParams {
    fn to_vars(&self) -> SearchVars {
        let sort = if self.sort.is_empty() {
            vec![DEFAULT_SORT.to_string()]
        } else {
            self.sort.clone()
        };
        SearchVars {
            page: self.page.unwrap_or(DEFAULT_PAGE),
            per_page: self.per_page.unwrap_or(DEFAULT_PER_PAGE),
            search: self.search.clone(),
            sort,
            genre_in: self.genres.clone(),
            tag_in: self.tags.clone(),
            season: self.season,
            season_year: self.season_year,
            format_in: self.formats.clone(),
            status_in: self.statuses.clone(),
            source_in: self.sources.clone(),
            is_adult: self.is_adult,
            id_in: self.ids.clone(),
            id_mal_in: self.mal_ids.clone(),
            media_type: "ANIME",
        }
    }
}

/// Anime broadcast season.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Season {
    Winter,
    Spring,
    Summer,
    Fall,
}

impl Season {
    /// Season a given calendar month (1-12) falls into.
    pub fn for_month(month: u32) -> Season {
        match month {
            1..=3 => Season::Winter,
            4..=6 => Season::Spring,
            7..=9 => Season::Summer,
            _ => Season::Fall,
        }
    }
}

#[derive(Debug, Serialize)]
struct GraphqlRequest<'a, V> {
    query: &'a str,
    variables: V,
}

#[derive(Debug, Deserialize)]
struct GraphqlResponse<T> {
    data: Option<T>,
    errors: Option<Vec<GraphqlErrorItem>>,
}

#[derive(Debug, Deserialize)]
struct GraphqlErrorItem {
    message: String,
}

#[derive(Debug, Serialize)]
struct MediaVars {
    #[serde(rename = "mediaId", skip_serializing_if = "Option::is_none")]
    media_id: Option<i64>,
    #[serde(rename = "malId", skip_serializing_if = "Option::is_none")]
    mal_id: Option<i64>,
    #[serde(rename = "type")]
    media_type: &'static str,
}

#[derive(Debug, Serialize)]
struct SearchVars {
    page: i32,
    #[serde(rename = "perPage")]
    per_page: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    search: Option<String>,
    sort: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    genre_in: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tag_in: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    season: Option<Season>,
    #[serde(rename = "seasonYear", skip_serializing_if = "Option::is_none")]
    season_year: Option<i32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    format_in: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    status_in: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    source_in: Vec<String>,
    #[serde(rename = "isAdult")]
    is_adult: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    id_in: Vec<i64>,
    #[serde(rename = "idMal_in", skip_serializing_if = "Vec::is_empty")]
    id_mal_in: Vec<i64>,
    #[serde(rename = "type")]
    media_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct MediaResponse {
    #[serde(rename = "Media")]
    media: Option<Media>,
}

#[derive(Debug, Deserialize)]
struct PageResponse {
    #[serde(rename = "Page")]
    page: Page,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    #[serde(default)]
    pub page_info: Option<PageInfo>,
    #[serde(default)]
    pub media: Vec<Media>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    #[serde(default)]
    pub total: Option<i64>,
    #[serde(default)]
    pub per_page: Option<i32>,
    #[serde(default)]
    pub current_page: Option<i32>,
    #[serde(default)]
    pub last_page: Option<i32>,
    #[serde(default)]
    pub has_next_page: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Media {
    pub id: i64,
    #[serde(default)]
    pub id_mal: Option<i64>,
    #[serde(default)]
    pub title: Option<Title>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub start_date: Option<FuzzyDate>,
    #[serde(default)]
    pub end_date: Option<FuzzyDate>,
    #[serde(default)]
    pub season: Option<String>,
    #[serde(default)]
    pub season_year: Option<i32>,
    #[serde(default)]
    pub episodes: Option<i32>,
    #[serde(default)]
    pub duration: Option<i32>,
    #[serde(default)]
    pub country_of_origin: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub trailer: Option<Trailer>,
    #[serde(default)]
    pub cover_image: Option<CoverImage>,
    #[serde(default)]
    pub banner_image: Option<String>,
    #[serde(default)]
    pub genres: Option<Vec<String>>,
    #[serde(default)]
    pub synonyms: Option<Vec<String>>,
    #[serde(default)]
    pub average_score: Option<i32>,
    #[serde(default)]
    pub mean_score: Option<i32>,
    #[serde(default)]
    pub popularity: Option<i64>,
    #[serde(default)]
    pub favourites: Option<i64>,
    #[serde(default)]
    pub is_adult: Option<bool>,
    #[serde(default)]
    pub site_url: Option<String>,
    #[serde(default)]
    pub studios: Option<StudioConnection>,
    #[serde(default)]
    pub tags: Option<Vec<MediaTag>>,
    #[serde(default)]
    pub next_airing_episode: Option<AiringSchedule>,
    #[serde(default)]
    pub relations: Option<RelationConnection>,
    #[serde(default)]
    pub characters: Option<CharacterConnection>,
    #[serde(default)]
    pub recommendations: Option<RecommendationConnection>,
}

impl Media {
    pub fn preferred_title(&self) -> Option<&str> {
        let title = self.title.as_ref()?;
        title
            .user_preferred
            .as_deref()
            .or(title.english.as_deref())
            .or(title.romaji.as_deref())
            .or(title.native.as_deref())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Title {
    #[serde(default)]
    pub romaji: Option<String>,
    #[serde(default)]
    pub english: Option<String>,
    #[serde(default)]
    pub native: Option<String>,
    #[serde(default)]
    pub user_preferred: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverImage {
    #[serde(default)]
    pub large: Option<String>,
    #[serde(default)]
    pub medium: Option<String>,
    #[serde(default)]
    pub extra_large: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FuzzyDate {
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub month: Option<i32>,
    #[serde(default)]
    pub day: Option<i32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Trailer {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub site: Option<String>,
    #[serde(default)]
    pub thumbnail: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaTag {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub rank: Option<i32>,
    #[serde(default)]
    pub is_media_spoiler: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StudioConnection {
    #[serde(default)]
    pub edges: Vec<StudioEdge>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StudioEdge {
    pub node: StudioNode,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudioNode {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub is_animation_studio: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiringSchedule {
    pub airing_at: i64,
    pub time_until_airing: i64,
    pub episode: i32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RelationConnection {
    #[serde(default)]
    pub edges: Vec<RelationEdge>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationEdge {
    pub id: i64,
    #[serde(default)]
    pub relation_type: Option<String>,
    pub node: MediaStub,
}

/// Trimmed media reference used inside relations and recommendations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaStub {
    pub id: i64,
    #[serde(default)]
    pub title: Option<Title>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default, rename = "type")]
    pub media_type: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub cover_image: Option<CoverImage>,
    #[serde(default)]
    pub average_score: Option<i32>,
    #[serde(default)]
    pub site_url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CharacterConnection {
    #[serde(default)]
    pub edges: Vec<CharacterEdge>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterEdge {
    pub id: i64,
    #[serde(default)]
    pub role: Option<String>,
    pub node: CharacterNode,
    #[serde(default)]
    pub voice_actors: Vec<StaffNode>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterNode {
    pub id: i64,
    #[serde(default)]
    pub name: Option<PersonName>,
    #[serde(default)]
    pub image: Option<CoverImage>,
    #[serde(default)]
    pub site_url: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaffNode {
    pub id: i64,
    #[serde(default)]
    pub name: Option<PersonName>,
    #[serde(default)]
    pub image: Option<CoverImage>,
    #[serde(default)]
    pub language_v2: Option<String>,
    #[serde(default)]
    pub site_url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonName {
    #[serde(default)]
    pub full: Option<String>,
    #[serde(default)]
    pub native: Option<String>,
    #[serde(default)]
    pub user_preferred: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecommendationConnection {
    #[serde(default)]
    pub nodes: Vec<RecommendationNode>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationNode {
    pub id: i64,
    #[serde(default)]
    pub rating: Option<i32>,
    #[serde(default)]
    pub media_recommendation: Option<MediaStub>,
}

#[cfg(test)]
mod tests {
    use super::{GraphqlResponse, Media, MediaResponse, SearchParams, Season};

    #[test]
    fn media_fragment_deserializes_from_api_shape() {
        let payload = r##"{
            "id": 21,
            "idMal": 21,
            "title": {
                "romaji": "One Piece",
                "english": "One Piece",
                "native": "ワンピース",
                "userPreferred": "One Piece"
            },
            "format": "TV",
            "status": "RELEASING",
            "seasonYear": 1999,
            "episodes": null,
            "coverImage": {
                "medium": "https://img.example/cover-small.jpg",
                "large": "https://img.example/cover.jpg",
                "extraLarge": null,
                "color": "#e4a15d"
            },
            "genres": ["Action", "Adventure"],
            "averageScore": 88,
            "isAdult": false,
            "studios": { "edges": [ { "node": { "id": 18, "name": "Toei Animation", "isAnimationStudio": true } } ] },
            "nextAiringEpisode": { "airingAt": 1719700000, "timeUntilAiring": 3600, "episode": 1108 }
        }"##;
        let media: Media = serde_json::from_str(payload).unwrap();
        assert_eq!(media.id, 21);
        assert_eq!(media.preferred_title(), Some("One Piece"));
        assert_eq!(media.cover_image.unwrap().medium.as_deref(), Some("https://img.example/cover-small.jpg"));
        assert_eq!(media.studios.unwrap().edges[0].node.name, "Toei Animation");
        assert_eq!(media.next_airing_episode.unwrap().episode, 1108);
    }

    #[test]
    fn unset_filters_stay_out_of_the_variables() {
        let vars = SearchParams {
            search: Some("frieren".to_string()),
            ..SearchParams::default()
        }
        .to_vars();
        let value = serde_json::to_value(vars).unwrap();
        let object = value.as_object().unwrap();
        assert_eq!(object["page"], 1);
        assert_eq!(object["perPage"], 24);
        assert_eq!(object["search"], "frieren");
        assert_eq!(object["sort"][0], "POPULARITY_DESC");
        assert_eq!(object["type"], "ANIME");
        assert!(!object.contains_key("genre_in"));
        assert!(!object.contains_key("season"));
        assert!(!object.contains_key("format_in"));
    }

    #[test]
    fn set_filters_serialize_under_graphql_names() {
        let vars = SearchParams {
            genres: vec!["Action".to_string()],
            season: Some(Season::Fall),
            season_year: Some(2024),
            formats: vec!["TV".to_string()],
            mal_ids: vec![5114],
            ..SearchParams::default()
        }
        .to_vars();
        let value = serde_json::to_value(vars).unwrap();
        assert_eq!(value["genre_in"][0], "Action");
        assert_eq!(value["season"], "FALL");
        assert_eq!(value["seasonYear"], 2024);
        assert_eq!(value["format_in"][0], "TV");
        assert_eq!(value["idMal_in"][0], 5114);
    }

    #[test]
    fn envelope_surfaces_data_and_errors() {
        let ok: GraphqlResponse<MediaResponse> =
            serde_json::from_str(r#"{"data":{"Media":{"id":1}}}"#).unwrap();
        assert!(ok.errors.is_none());
        assert_eq!(ok.data.unwrap().media.unwrap().id, 1);

        let failed: GraphqlResponse<MediaResponse> = serde_json::from_str(
            r#"{"data":null,"errors":[{"message":"Not Found.","status":404}]}"#,
        )
        .unwrap();
        assert!(failed.data.is_none());
        assert_eq!(failed.errors.unwrap()[0].message, "Not Found.");
    }

    #[test]
    fn months_map_to_broadcast_seasons() {
        assert_eq!(Season::for_month(1), Season::Winter);
        assert_eq!(Season::for_month(4), Season::Spring);
        assert_eq!(Season::for_month(8), Season::Summer);
        assert_eq!(Season::for_month(12), Season::Fall);
    }
}

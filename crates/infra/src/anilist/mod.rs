pub mod graphql;

pub use graphql::{
    AnilistClient, AnilistError, Media, MediaStub, Page, PageInfo, SearchParams, Season,
};

pub mod anilist;
pub mod kv;

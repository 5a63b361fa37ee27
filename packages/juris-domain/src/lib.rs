pub mod bonus;
pub mod dedup;
pub mod fusion;
pub mod hit;
pub mod normalize;
pub mod profile;
pub mod select;
pub mod text;

mod fetch;
mod record;
mod transform;

pub use fetch::{POSTS_QUERY, build_query, fetch_content};
pub use record::{ContentRecord, FeaturedImage, Term, parse_response};
pub use transform::{
    NormalizedRecord, TransformOutcome, normalize_date, rewrite_body, strip_attributes,
    strip_tags, transform_record,
};

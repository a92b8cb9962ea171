pub mod change;
pub mod profile;

pub use change::{ChangeDocument, ChangeEvent};
pub use profile::{
    format_timestamp, now_timestamp, timestamp_after, ProfileDetails, StateRecord, BIO_NOT_FOUND,
    FOLLOWERS_NOT_FOUND, FOLLOWINGS_NOT_FOUND, PHOTO_NOT_FOUND, TIMESTAMP_FORMAT,
};

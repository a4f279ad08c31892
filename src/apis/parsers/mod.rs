pub mod mtggoldfish;

pub use mtggoldfish::{MtgGoldfishListing, MtgGoldfishParser};

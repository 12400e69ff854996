use bson::{doc, Document};

/// The compatibility version presented to drivers.
const COMPAT_VERSION: &str = "5.0.42";

pub(crate) fn handle() -> Document {
    doc! {
        "version": COMPAT_VERSION,
        "versionArray": [5_i32, 0_i32, 42_i32, 0_i32],
        "bits": 64_i32,
        "debug": false,
        "maxBsonObjectSize": 16 * 1024 * 1024_i32,
        "ok": 1.0,
    }
}

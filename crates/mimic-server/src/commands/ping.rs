use bson::{doc, Document};

pub(crate) fn handle() -> Document {
    doc! { "ok": 1.0 }
}

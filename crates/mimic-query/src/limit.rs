use bson::Document;

/// Bound `docs` to at most `limit` documents.
///
/// Sign semantics, pinned by the tests below: `0` means unlimited, positive
/// values bound the count, and a negative value behaves as its absolute
/// value (`-2` keeps at most two documents).
pub fn limit_documents(mut docs: Vec<Document>, limit: i64) -> Vec<Document> {
    if limit == 0 {
        return docs;
    }
    let n = limit.unsigned_abs().min(docs.len() as u64) as usize;
    docs.truncate(n);
    docs
}

#[cfg(test)]
mod tests {
    use bson::doc;

    use super::*;

    fn docs(n: usize) -> Vec<Document> {
        (0..n).map(|i| doc! { "i": i as i32 }).collect()
    }

    #[test]
    fn zero_is_unlimited() {
        assert_eq!(limit_documents(docs(5), 0).len(), 5);
    }

    #[test]
    fn one_keeps_at_most_one() {
        assert_eq!(limit_documents(docs(5), 1).len(), 1);
        assert_eq!(limit_documents(docs(0), 1).len(), 0);
    }

    #[test]
    fn positive_bounds_the_count() {
        assert_eq!(limit_documents(docs(5), 3).len(), 3);
        assert_eq!(limit_documents(docs(2), 3).len(), 2);
    }

    #[test]
    fn negative_behaves_as_absolute_value() {
        assert_eq!(limit_documents(docs(5), -2).len(), 2);
        assert_eq!(limit_documents(docs(5), i64::MIN).len(), 5);
    }

    #[test]
    fn keeps_the_leading_documents() {
        let kept = limit_documents(docs(5), 2);
        assert_eq!(kept, vec![doc! { "i": 0 }, doc! { "i": 1 }]);
    }
}

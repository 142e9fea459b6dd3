//! Offset/limit windows over ordered listings.

use serde::Serialize;

/// One window of a listing plus the size of the whole listing.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub offset: usize,
    pub limit: usize,
}

/// Take `limit` items starting at `offset`. Never reorders; an offset past
/// the end, or a zero limit, gives an empty window with the true total.
pub fn paginate<I>(items: I, offset: usize, limit: usize) -> Page<I::Item>
where
    I: ExactSizeIterator,
{
    let total = items.len();
    let items = items.skip(offset).take(limit).collect();
    Page { items, total, offset, limit }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageLinks {
    #[serde(rename = "self")]
    pub this: String,
    pub first: String,
    pub last: String,
    pub next: Option<String>,
    pub prev: Option<String>,
}

impl<T> Page<T> {
    /// Navigation links for this window. `base` is the route URL without a
    /// query string; `extra` carries other parameters (already encoded) that
    /// every link must repeat, such as filters.
    pub fn links(&self, base: &str, extra: &str) -> PageLinks {
        let link = |offset: usize| {
            let mut url = format!("{base}?page[offset]={offset}&page[limit]={}", self.limit);
            if !extra.is_empty() {
                url.push('&');
                url.push_str(extra);
            }
            url
        };
        let last = if self.limit == 0 || self.total == 0 { 0 } else { (self.total - 1) / self.limit * self.limit };
        let end = self.offset.saturating_add(self.limit);
        PageLinks {
            this: link(self.offset),
            first: link(0),
            last: link(last),
            next: (self.limit > 0 && end < self.total).then(|| link(end)),
            prev: (self.limit > 0 && self.offset > 0).then(|| link(self.offset.saturating_sub(self.limit))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn middle_window_of_three() {
        let page = paginate(["a", "b", "c"].into_iter(), 1, 1);
        assert_eq!(page.items, vec!["b"]);
        assert_eq!(page.total, 3);
    }

    #[test]
    fn offset_past_end_and_zero_limit_are_empty() {
        let past = paginate(0..5, 9, 3);
        assert!(past.items.is_empty());
        assert_eq!(past.total, 5);
        let zero = paginate(0..5, 0, 0);
        assert!(zero.items.is_empty());
        assert_eq!(zero.total, 5);
    }

    #[test]
    fn links_at_the_edges() {
        let first = paginate(0..25, 0, 10);
        let l = first.links("/entries/x", "");
        assert_eq!(l.this, "/entries/x?page[offset]=0&page[limit]=10");
        assert_eq!(l.last, "/entries/x?page[offset]=20&page[limit]=10");
        assert_eq!(l.next.as_deref(), Some("/entries/x?page[offset]=10&page[limit]=10"));
        assert!(l.prev.is_none());

        let tail = paginate(0..25, 20, 10);
        let l = tail.links("/search", "fields=count");
        assert!(l.next.is_none());
        assert_eq!(l.prev.as_deref(), Some("/search?page[offset]=10&page[limit]=10&fields=count"));
    }
}

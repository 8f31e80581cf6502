//! Compressed notation for sets of unit numbers (`1-3,5,7-9`).

use std::collections::BTreeSet;

/// Errors raised while reading a segment list.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SegmentError {
    #[error("invalid unit number '{0}'")]
    InvalidNumber(String),

    #[error("range '{0}' ends before it starts")]
    InvalidRange(String),
}

/// Render unit ids as a sorted, comma-joined list of runs.
///
/// Consecutive ids collapse to `a-b`, isolated ids stay bare. An empty set
/// renders as an empty string.
pub fn human_readable_segments<I>(ids: I) -> String
where
    I: IntoIterator<Item = i64>,
{
    let sorted: BTreeSet<i64> = ids.into_iter().collect();
    let mut runs: Vec<(i64, i64)> = Vec::new();

    for id in sorted {
        match runs.last_mut() {
            Some((_, end)) if *end + 1 == id => *end = id,
            _ => runs.push((id, id)),
        }
    }

    runs.iter()
        .map(|&(start, end)| {
            if start == end {
                start.to_string()
            } else {
                format!("{}-{}", start, end)
            }
        })
        .collect::<Vec<_>>()
        .join(",")
}

/// Parse a list produced by [`human_readable_segments`] back into ids.
///
/// Whitespace around items is ignored, as are empty items.
pub fn parse_segments(text: &str) -> Result<BTreeSet<i64>, SegmentError> {
    let mut ids = BTreeSet::new();

    for item in text.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        // A leading '-' would be a sign, so split on the first '-' after it.
        let split_at = item
            .char_indices()
            .skip(1)
            .find(|&(_, c)| c == '-')
            .map(|(i, _)| i);

        match split_at {
            Some(i) => {
                let start = parse_number(&item[..i])?;
                let end = parse_number(&item[i + 1..])?;
                if end < start {
                    return Err(SegmentError::InvalidRange(item.to_string()));
                }
                ids.extend(start..=end);
            }
            None => {
                ids.insert(parse_number(item)?);
            }
        }
    }

    Ok(ids)
}

fn parse_number(s: &str) -> Result<i64, SegmentError> {
    s.trim()
        .parse::<i64>()
        .map_err(|_| SegmentError::InvalidNumber(s.trim().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merges_runs() {
        assert_eq!(human_readable_segments([1, 2, 3, 5, 7, 8, 9]), "1-3,5,7-9");
    }

    #[test]
    fn test_unsorted_input_with_duplicates() {
        assert_eq!(human_readable_segments([9, 1, 3, 2, 2, 8]), "1-3,8-9");
    }

    #[test]
    fn test_empty_and_singleton() {
        assert_eq!(human_readable_segments(Vec::<i64>::new()), "");
        assert_eq!(human_readable_segments([4]), "4");
    }

    #[test]
    fn test_parse_inverts_rendering() {
        let ids: BTreeSet<i64> = [1, 2, 3, 5, 7, 8, 9, 40].into_iter().collect();
        let text = human_readable_segments(ids.iter().copied());
        let parsed = parse_segments(&text).unwrap();

        assert_eq!(parsed, ids);
        assert_eq!(human_readable_segments(parsed), text);
    }

    #[test]
    fn test_parse_tolerates_whitespace() {
        let parsed = parse_segments(" 1 - 3 , 5 ,").unwrap();
        assert_eq!(parsed.into_iter().collect::<Vec<_>>(), vec![1, 2, 3, 5]);
        assert!(parse_segments("").unwrap().is_empty());
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(
            parse_segments("1,x"),
            Err(SegmentError::InvalidNumber("x".to_string()))
        );
        assert_eq!(
            parse_segments("5-2"),
            Err(SegmentError::InvalidRange("5-2".to_string()))
        );
    }
}

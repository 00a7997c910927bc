//! Custom typed headers for OCI chunked upload support, ported from
//! `portfolio_http::headers`: the distribution spec's `Content-Range`/`Range` values are
//! `{start}-{end}` byte-range pairs, which neither `axum`'s nor `headers`' built-in `Range`
//! type models (that one is the multi-range HTTP/1.1 form), so both are hand-rolled here.
use headers::{Header, HeaderName, HeaderValue};

#[derive(Debug, Clone, Copy)]
pub struct ContentRange {
    pub start: u64,
    pub end: u64,
}

static CONTENT_RANGE_NAME: HeaderName = HeaderName::from_static("content-range");

impl Header for ContentRange {
    fn name() -> &'static HeaderName {
        &CONTENT_RANGE_NAME
    }

    fn decode<'i, I>(values: &mut I) -> Result<Self, headers::Error>
    where
        I: Iterator<Item = &'i HeaderValue>,
    {
        let (start, end) = parse_range_pair(values)?;
        Ok(ContentRange { start, end })
    }

    fn encode<E>(&self, values: &mut E)
    where
        E: Extend<HeaderValue>,
    {
        encode_range_pair(self.start, self.end, values)
    }
}

/// The `Range: {start}-{end}` response header returned from upload-session status/PATCH
/// handlers (distinct from `ContentRange`, which is a request header on PATCH bodies).
#[derive(Debug, Clone, Copy)]
pub struct Range {
    pub start: u64,
    pub end: u64,
}

impl From<ContentRange> for Range {
    fn from(cr: ContentRange) -> Range {
        Range {
            start: cr.start,
            end: cr.end,
        }
    }
}

static RANGE_NAME: HeaderName = HeaderName::from_static("range");

impl Header for Range {
    fn name() -> &'static HeaderName {
        &RANGE_NAME
    }

    fn decode<'i, I>(values: &mut I) -> Result<Self, headers::Error>
    where
        I: Iterator<Item = &'i HeaderValue>,
    {
        let (start, end) = parse_range_pair(values)?;
        Ok(Range { start, end })
    }

    fn encode<E>(&self, values: &mut E)
    where
        E: Extend<HeaderValue>,
    {
        encode_range_pair(self.start, self.end, values)
    }
}

fn parse_range_pair<'i, I>(values: &mut I) -> Result<(u64, u64), headers::Error>
where
    I: Iterator<Item = &'i HeaderValue>,
{
    let value = values.next().ok_or_else(headers::Error::invalid)?;
    let s = value.to_str().map_err(|_| headers::Error::invalid())?;
    let parts: Vec<u64> = s
        .split('-')
        .map(|p| p.parse::<u64>())
        .collect::<Result<Vec<u64>, _>>()
        .map_err(|_| headers::Error::invalid())?;
    if parts.len() != 2 {
        return Err(headers::Error::invalid());
    }
    Ok((parts[0], parts[1]))
}

fn encode_range_pair<E>(start: u64, end: u64, values: &mut E)
where
    E: Extend<HeaderValue>,
{
    let value =
        HeaderValue::from_str(&format!("{start}-{end}")).expect("decimal range string is always a valid header value");
    values.extend(std::iter::once(value));
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn range_round_trips_through_header_value() {
        let value = HeaderValue::from_static("0-511");
        let decoded = Range::decode(&mut std::iter::once(&value)).unwrap();
        assert_eq!(decoded.start, 0);
        assert_eq!(decoded.end, 511);
    }
}

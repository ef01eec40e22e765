use snafu::ensure;
use url::{Url, form_urlencoded};

use crate::{QueryArgs, Result, UrlDefect, error::MalformedUrlSnafu};

const SUPPORTED_SCHEMES: [&str; 2] = ["http", "https"];

/// Parses `url` as an absolute http(s) url.
///
/// This is a purely syntactic check, no name resolution is attempted.
pub fn parse_absolute(url: &str) -> Result<Url> {
    ensure!(
        !url.is_empty(),
        MalformedUrlSnafu {
            url,
            reason: UrlDefect::Empty,
        }
    );
    // `Url::parse` silently strips or percent-encodes some whitespace
    ensure!(
        !url.chars().any(char::is_whitespace),
        MalformedUrlSnafu {
            url,
            reason: UrlDefect::Whitespace,
        }
    );

    let parsed = Url::parse(url).map_err(|e| {
        MalformedUrlSnafu {
            url,
            reason: UrlDefect::Unparsable(e),
        }
        .build()
    })?;

    ensure!(
        SUPPORTED_SCHEMES.contains(&parsed.scheme()),
        MalformedUrlSnafu {
            url,
            reason: UrlDefect::UnsupportedScheme(parsed.scheme().to_string()),
        }
    );
    ensure!(
        parsed.host_str().is_some_and(|h| !h.is_empty()),
        MalformedUrlSnafu {
            url,
            reason: UrlDefect::MissingHost,
        }
    );

    Ok(parsed)
}

pub fn is_valid_url(url: &str) -> bool {
    parse_absolute(url).is_ok()
}

/// Merges `args` onto the query string of `url`.
///
/// A key present in `args` replaces every pair with that key in `url`. Pairs only
/// present in `url` keep their original order and exact encoding and come first.
pub fn merge_query(url: &Url, args: &QueryArgs) -> Url {
    if args.is_empty() {
        return url.clone();
    }

    let mut segments: Vec<String> = url
        .query()
        .unwrap_or_default()
        .split('&')
        .filter(|segment| !segment.is_empty() && !is_overridden(segment, args))
        .map(str::to_string)
        .collect();
    segments.push(
        form_urlencoded::Serializer::new(String::new())
            .extend_pairs(args.iter())
            .finish(),
    );

    let mut merged = url.clone();
    merged.set_query(Some(&segments.join("&")));
    merged
}

fn is_overridden(segment: &str, args: &QueryArgs) -> bool {
    form_urlencoded::parse(segment.as_bytes())
        .next()
        .is_some_and(|(key, _)| args.contains_key(key.as_ref()))
}

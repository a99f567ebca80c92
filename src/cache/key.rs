//! Deterministic cache keys built from an endpoint and its query parameters.

// self
use crate::_prelude::*;

/// Separator placed between rendered `key:value` pairs.
pub const PARAM_DELIMITER: char = '|';

/// Builds the cache identity for `endpoint` + `params`.
///
/// Parameters are sorted by name and rendered as `key:value`, joined with [`PARAM_DELIMITER`],
/// and appended after `?`. Insertion order never affects the result. Without parameters the
/// key is the bare endpoint.
///
/// Names and values are inserted verbatim. A value containing `|` or `:` can therefore render
/// the same key as a different parameter set (`{a: "1|b:2"}` and `{a: 1, b: 2}`), so callers
/// must not pass such values for parameters that distinguish cached responses.
pub fn generate_cache_key<I, K, V>(endpoint: &str, params: I) -> String
where
	I: IntoIterator<Item = (K, V)>,
	K: AsRef<str>,
	V: Display,
{
	let mut rendered = params
		.into_iter()
		.map(|(key, value)| (key.as_ref().to_owned(), value.to_string()))
		.collect::<Vec<_>>();

	if rendered.is_empty() {
		return endpoint.to_owned();
	}

	// Stable sort on names only; duplicate names keep their caller order.
	rendered.sort_by(|a, b| a.0.cmp(&b.0));

	let mut key = String::with_capacity(endpoint.len() + rendered.len() * 8);

	key.push_str(endpoint);
	key.push('?');

	for (idx, (name, value)) in rendered.iter().enumerate() {
		if idx > 0 {
			key.push(PARAM_DELIMITER);
		}

		key.push_str(name);
		key.push(':');
		key.push_str(value);
	}

	key
}

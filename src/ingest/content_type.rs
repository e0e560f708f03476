// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use url::Url;

/// Generic binary type that says nothing about the payload
const OCTET_STREAM: &str = "application/octet-stream";

/// Pick a MIME type for ingested media
///
/// The first non-blank candidate wins: the type given with the episode, then
/// the type the transport reported, then one guessed from the URL's file
/// extension. An explicit `application/octet-stream` counts as unset.
pub fn resolve_content_type(
    explicit: Option<&str>,
    transport: Option<&str>,
    source: &Url,
) -> Option<String> {
    let explicit = non_blank(explicit).filter(|value| !value.eq_ignore_ascii_case(OCTET_STREAM));

    explicit
        .or_else(|| non_blank(transport))
        .map(str::to_string)
        .or_else(|| guess_from_extension(source))
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

fn guess_from_extension(source: &Url) -> Option<String> {
    let file_name = source.path_segments()?.next_back()?;
    let (_, extension) = file_name.rsplit_once('.')?;
    mime_guess::from_ext(&extension.to_ascii_lowercase())
        .first()
        .map(|mime| mime.essence_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn explicit_type_wins() {
        let resolved = resolve_content_type(
            Some("audio/mp4"),
            Some("audio/mpeg"),
            &url("http://host/file.ogg"),
        );
        assert_eq!(resolved.as_deref(), Some("audio/mp4"));
    }

    #[test]
    fn transport_type_is_second() {
        let resolved =
            resolve_content_type(None, Some("audio/mpeg"), &url("http://host/file.ogg"));
        assert_eq!(resolved.as_deref(), Some("audio/mpeg"));
    }

    #[test]
    fn blank_and_octet_stream_explicit_types_are_ignored() {
        let resolved = resolve_content_type(
            Some("  "),
            Some("audio/mpeg"),
            &url("http://host/file"),
        );
        assert_eq!(resolved.as_deref(), Some("audio/mpeg"));

        let resolved = resolve_content_type(
            Some("application/octet-stream"),
            None,
            &url("http://host/file.mp3"),
        );
        assert_eq!(resolved.as_deref(), Some("audio/mpeg"));
    }

    #[test]
    fn falls_back_to_extension() {
        let resolved = resolve_content_type(None, None, &url("http://host/show/EP1.MP3?x=1"));
        assert_eq!(resolved.as_deref(), Some("audio/mpeg"));
    }

    #[test]
    fn nothing_to_go_on_yields_none() {
        assert_eq!(resolve_content_type(None, None, &url("http://host/file")), None);
        assert_eq!(
            resolve_content_type(None, Some(""), &url("http://host/dir/")),
            None
        );
        assert_eq!(
            resolve_content_type(None, None, &url("http://host/file.zzzunknown")),
            None
        );
    }
}

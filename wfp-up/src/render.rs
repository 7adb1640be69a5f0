//! HTML pages
//!
//! Every interpolated value is escaped; filenames and peak data come straight
//! from the caller and the tool.

use crate::error::PipelineError;
use crate::pipeline::PeakReport;

/// Escape text for element content and double-quoted attribute values
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Upload form served at `/`
pub fn index_page(max_upload_bytes: u64) -> String {
    format!(
        r#"<!doctype html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>Waveform data generator</title>
</head>
<body>
    <h1>Waveform data generator</h1>
    <p>Upload an MP3 file (max {max_upload_bytes} bytes) to get its duration and peaks data.</p>
    <form action="/upload" method="post" enctype="multipart/form-data">
        <input type="file" name="file" accept="audio/mpeg,.mp3" required>
        <button type="submit">Upload</button>
    </form>
</body>
</html>
"#
    )
}

/// Results page for a successful run
pub fn results_page(report: &PeakReport) -> String {
    format!(
        r#"<!doctype html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>Waveform data results</title>
    <style type="text/css">
        dt {{ font-weight: bold; }}
        dd {{ margin: 0; }}
    </style>
</head>
<body>
    <h1>Results for file <code>{filename}</code></h1>
    <dl style="display: grid; grid-template-columns: max-content auto; gap: 2rem;">
        <dt>Duration</dt>
        <dd><input type="text" readonly value="{duration}" size="8"> seconds</dd>
        <dt>Peaks data</dt>
        <dd><textarea readonly style="width: 100%" rows="15">{peaks}</textarea></dd>
    </dl>
    <p><a href="/">Back</a></p>
</body>
</html>
"#,
        filename = escape_html(&report.filename),
        duration = report.display_duration(),
        peaks = escape_html(&report.peak_text()),
    )
}

/// Failure page: the short message plus the stable error kind, never diagnostics
pub fn failure_page(err: &PipelineError) -> String {
    format!(
        r#"<!doctype html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>Waveform data error</title>
</head>
<body>
    <p class="error" data-error-kind="{kind}">{message}</p>
    <p><a href="/">Back</a></p>
</body>
</html>
"#,
        kind = err.kind().as_str(),
        message = escape_html(&err.user_message()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report() -> PeakReport {
        PeakReport {
            filename: "<b>mix</b> & \"edit\".mp3".to_string(),
            duration_secs: 187.999,
            samples_per_second: 8,
            peak_data: br#"{"data":[-3,4]}"#.to_vec(),
        }
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<a href="x">'t' & u</a>"#),
            "&lt;a href=&quot;x&quot;&gt;&#39;t&#39; &amp; u&lt;/a&gt;"
        );
        assert_eq!(escape_html("plain"), "plain");
    }

    #[test]
    fn test_results_page_shows_truncated_duration() {
        let html = results_page(&report());
        assert!(html.contains(r#"value="187""#));
        assert!(!html.contains("187.999"));
    }

    #[test]
    fn test_results_page_escapes_filename_and_peaks() {
        let html = results_page(&report());
        assert!(html.contains("&lt;b&gt;mix&lt;/b&gt; &amp; &quot;edit&quot;.mp3"));
        assert!(html.contains("{&quot;data&quot;:[-3,4]}"));
        assert!(!html.contains("<b>mix</b>"));
    }

    #[test]
    fn test_failure_page_carries_kind() {
        let err = PipelineError::DataPassFailed {
            exit_code: Some(1),
            diagnostic: "internal detail".to_string(),
        };
        let html = failure_page(&err);
        assert!(html.contains(r#"data-error-kind="DATA_PASS_FAILED""#));
        assert!(html.contains("Data pass failed"));
        assert!(!html.contains("internal detail"));
    }

    #[test]
    fn test_index_page_posts_file_field() {
        let html = index_page(1024);
        assert!(html.contains(r#"action="/upload""#));
        assert!(html.contains(r#"name="file""#));
        assert!(html.contains("max 1024 bytes"));
    }
}

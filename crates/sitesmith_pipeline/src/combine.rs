//! Combination of per-step artifacts into the final artifact.

use regex::Regex;
use sitesmith_error::{GenerationError, GenerationErrorKind, GenerationResult};

/// Merges step artifacts.
///
/// The last step's artifact wins when it is non-empty. Otherwise every step's
/// stylesheet, script and markup regions are concatenated in step order into
/// one HTML5 document.
///
/// # Examples
///
/// ```
/// use sitesmith_pipeline::ArtifactCombiner;
///
/// let combiner = ArtifactCombiner::new().unwrap();
/// let steps = vec!["<main>a</main>".to_string(), "<main>b</main>".to_string()];
/// assert_eq!(combiner.combine(&steps), "<main>b</main>");
/// ```
#[derive(Debug, Clone)]
pub struct ArtifactCombiner {
    style: Regex,
    script: Regex,
    style_or_script: Regex,
    document_shell: Regex,
    head: Regex,
}

fn compile(pattern: &str) -> GenerationResult<Regex> {
    Regex::new(pattern).map_err(|e| {
        GenerationError::new(GenerationErrorKind::InternalFault(format!(
            "invalid combination pattern: {}",
            e
        )))
    })
}

impl ArtifactCombiner {
    /// Compile the region patterns.
    pub fn new() -> GenerationResult<Self> {
        Ok(Self {
            style: compile(r"(?i)<style[^>]*>([\s\S]*?)</style>")?,
            script: compile(r"(?i)<script[^>]*>([\s\S]*?)</script>")?,
            style_or_script: compile(r"(?i)<style[\s\S]*?</style>|<script[\s\S]*?</script>")?,
            document_shell: compile(r"(?i)<!DOCTYPE[^>]*>|</?(?:html|body)[^>]*>")?,
            head: compile(r"(?i)<head(?:\s[^>]*)?>[\s\S]*?</head>")?,
        })
    }

    /// Combine artifacts given in step order.
    pub fn combine(&self, artifacts: &[String]) -> String {
        match artifacts.last() {
            Some(last) if !last.trim().is_empty() => last.clone(),
            _ => self.merge(artifacts),
        }
    }

    fn merge(&self, artifacts: &[String]) -> String {
        let mut css = Vec::new();
        let mut js = Vec::new();
        let mut html = Vec::new();

        for code in artifacts.iter().filter(|c| !c.trim().is_empty()) {
            css.extend(
                self.style
                    .captures_iter(code)
                    .filter_map(|c| c.get(1))
                    .map(|m| m.as_str().trim().to_string()),
            );
            js.extend(
                self.script
                    .captures_iter(code)
                    .filter_map(|c| c.get(1))
                    .map(|m| m.as_str().trim().to_string()),
            );
            let markup = self.style_or_script.replace_all(code, "");
            let markup = self.head.replace_all(&markup, "");
            let markup = self.document_shell.replace_all(&markup, "");
            let markup = markup.trim();
            if !markup.is_empty() {
                html.push(markup.to_string());
            }
        }

        format!(
            "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"UTF-8\">\n\
             <meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n\
             <style>\n{}\n</style>\n</head>\n<body>\n{}\n<script>\n{}\n</script>\n</body>\n</html>",
            css.join("\n"),
            html.join("\n"),
            js.join("\n")
        )
    }
}

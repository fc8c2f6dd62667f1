//! User-facing rendering of fatal errors.
//!
//! Errors travel as `anyhow::Error`. When one of the typed diagnostics is in
//! the cause chain its code and help text are printed under the message.

use std::fmt::Write as _;

use miette::Diagnostic as MietteDiagnostic;

use crate::core::capabilities::SafeqlError;
use crate::ops::patch::PatchError;

/// Common suggestion messages.
pub mod suggestions {
    /// No `package.json` above the working directory.
    pub const NO_MANIFEST: &str = "Run lintpack from a directory containing package.json";

    /// Templates could not be located.
    pub const NO_TEMPLATES: &str =
        "Pass --templates <dir> or set LINTPACK_TEMPLATES to the templates directory";
}

/// Find the first typed diagnostic in the cause chain of `err`.
pub fn find_diagnostic(err: &anyhow::Error) -> Option<&dyn MietteDiagnostic> {
    err.chain().find_map(|cause| {
        if let Some(e) = cause.downcast_ref::<PatchError>() {
            return Some(e as &dyn MietteDiagnostic);
        }
        if let Some(e) = cause.downcast_ref::<SafeqlError>() {
            return Some(e as &dyn MietteDiagnostic);
        }
        None
    })
}

/// Render `err` the way `main` prints it.
///
/// ```text
/// error: <message>: <cause>: ...
///   = code: <diagnostic code>
///   = help: <help text>
/// ```
pub fn render_error(err: &anyhow::Error, color: bool) -> String {
    let label = if color {
        "\x1b[1;31merror\x1b[0m"
    } else {
        "error"
    };
    let mut out = format!("{}: {:#}\n", label, err);

    if let Some(diag) = find_diagnostic(err) {
        if let Some(code) = diag.code() {
            let _ = writeln!(out, "  = code: {}", code);
        }
        if let Some(help) = diag.help() {
            let _ = writeln!(out, "  = help: {}", help);
        }
    } else if let Some(hint) = fallback_hint(err) {
        let _ = writeln!(out, "  = help: {}", hint);
    }

    out
}

/// Help for untyped errors recognizable by their message.
fn fallback_hint(err: &anyhow::Error) -> Option<&'static str> {
    let message = format!("{:#}", err);
    if message.contains("could not find package.json") {
        Some(suggestions::NO_MANIFEST)
    } else if message.contains("templates directory") || message.contains("template directory")
    {
        Some(suggestions::NO_TEMPLATES)
    } else {
        None
    }
}

/// Print an error to stderr.
pub fn emit_error(err: &anyhow::Error, color: bool) {
    eprint!("{}", render_error(err, color));
}

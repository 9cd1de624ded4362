use std::io::{self, Write};

use anyhow::Error;

use crate::util::text::wrap;

#[rustfmt::skip]
pub fn print_error(err: &Error) {
    let mut stderr = io::stderr().lock();

    let _ = writeln!(stderr);
    let _ = writeln!(stderr, "   ╔══════════════════════════════════════════════════════════════╗");
    let _ = writeln!(stderr, "   ║  ✗ Error                                                     ║");
    let _ = writeln!(stderr, "   ╟──────────────────────────────────────────────────────────────╢");

    for line in wrap(&err.to_string(), 59) {
        let _ = writeln!(stderr, "   ║  {:<59} ║", line);
    }

    for cause in err.chain().skip(1) {
        let _ = writeln!(stderr, "   ╟──────────────────────────────────────────────────────────────╢");
        let _ = writeln!(stderr, "   ║  Caused by:                                                  ║");
        for line in wrap(&cause.to_string(), 57) {
            let _ = writeln!(stderr, "   ║    {:<57} ║", line);
        }
    }

    if let Some(hints) = HintCollector::collect(err) {
        let _ = writeln!(stderr, "   ╟──────────────────────────────────────────────────────────────╢");
        let _ = writeln!(stderr, "   ║  Hints:                                                      ║");
        for hint in hints {
            let wrapped = wrap(&hint, 55);
            if let Some((first, rest)) = wrapped.split_first() {
                let _ = writeln!(stderr, "   ║    • {:<55} ║", first);
                for line in rest {
                    let _ = writeln!(stderr, "   ║      {:<55} ║", line);
                }
            }
        }
    }

    let _ = writeln!(stderr, "   ╚══════════════════════════════════════════════════════════════╝");
    let _ = writeln!(stderr);
}

struct HintCollector {
    hints: Vec<String>,
    has_typed_hints: bool,
}

impl HintCollector {
    fn new() -> Self {
        Self {
            hints: Vec::new(),
            has_typed_hints: false,
        }
    }

    fn collect(err: &Error) -> Option<Vec<String>> {
        let mut collector = Self::new();

        collector.collect_io_hints(err);
        collector.collect_pka_hints(err);

        if !collector.has_typed_hints {
            collector.collect_fallback_hints(err);
        }

        if collector.hints.is_empty() {
            None
        } else {
            Some(collector.hints)
        }
    }

    fn add(&mut self, hint: impl Into<String>) {
        self.hints.push(hint.into());
    }

    fn mark_typed(&mut self) {
        self.has_typed_hints = true;
    }

    fn collect_io_hints(&mut self, err: &Error) {
        use pka_forge::io::Error as IoError;

        let Some(io_err) = err.downcast_ref::<IoError>() else {
            if let Some(source) = err.downcast_ref::<std::io::Error>() {
                self.mark_typed();
                self.collect_std_io_hints(source);
            }
            return;
        };

        self.mark_typed();

        match io_err {
            IoError::Io { source } => {
                self.collect_std_io_hints(source);
            }

            IoError::Parse {
                format, position, ..
            } => {
                self.add(format!(
                    "Parser encountered an issue at {} in {} input",
                    position, format
                ));
                self.add("Try specifying --infmt to ensure correct format detection");
                self.add_format_specific_parse_hints(*format);
            }

            IoError::Sanitize { .. } => {
                self.add("The structure parsed but is not chemically sensible");
                self.add("Check valences, charges and aromatic ring closures");
            }
        }
    }

    fn collect_std_io_hints(&mut self, source: &std::io::Error) {
        use std::io::ErrorKind;

        match source.kind() {
            ErrorKind::NotFound => {
                self.add("File or directory not found");
                self.add("Check the path spelling and ensure the file exists");
            }

            ErrorKind::PermissionDenied => {
                self.add("Permission denied accessing the file");
                self.add("Check file permissions with `ls -la`");
            }

            ErrorKind::InvalidData => {
                self.add("File contains invalid or corrupt data");
                self.add("Input files must be UTF-8 text");
            }

            ErrorKind::BrokenPipe => {
                self.add("Output consumer terminated early");
                self.add("This may occur when piping to commands like `head`");
            }

            _ => {
                self.add("I/O operation failed");
                self.add("Check file path, permissions, and disk space");
            }
        }
    }

    fn add_format_specific_parse_hints(&mut self, format: pka_forge::io::Format) {
        use pka_forge::io::Format;

        match format {
            Format::Smiles => {
                self.add("SMILES: Check ring closure digits and bracket atoms");
                self.add("SMILES: Quote the string in the shell to protect ( ) and #");
            }

            Format::Sdf => {
                self.add("SDF: Only V2000 connection tables are supported");
                self.add("SDF: Check the counts line and the atom and bond blocks");
            }
        }
    }

    fn collect_pka_hints(&mut self, err: &Error) {
        use pka_forge::PkaError;

        let Some(pka_err) = err.downcast_ref::<PkaError>() else {
            return;
        };

        self.mark_typed();

        match pka_err {
            PkaError::InvalidStructure(msg) => {
                self.collect_structure_hints(msg);
            }

            PkaError::ModelLoad { polarity, path, .. } => {
                self.add(format!(
                    "The {} model is needed because the structure has {} sites",
                    polarity, polarity
                ));
                if path.exists() {
                    self.add("The weight file exists but could not be decoded");
                    self.add("Expected a safetensors or PyTorch state dict with conv, bn and fc layers");
                } else {
                    self.add(format!("Expected weights at {}", path.display()));
                }
                self.add("Point --models (or PKAFORGE_MODEL_DIR) at the weight directory");
            }

            PkaError::InvalidAtomId { atom, atom_count } => {
                self.add(format!(
                    "Atom {} was requested on a molecule with {} atoms",
                    atom, atom_count
                ));
                self.add("This indicates a bug; please report if reproducible");
            }

            PkaError::PatternTable(msg) => {
                self.add("The custom ionization pattern table is invalid");
                self.collect_pattern_hints(msg);
            }

            PkaError::Inference(_) => {
                self.add("The tensor runtime failed during prediction");
                self.add("Retry with --device cpu");
            }
        }
    }

    fn collect_structure_hints(&mut self, msg: &str) {
        let msg_lower = msg.to_lowercase();

        if msg_lower.contains("fragment") || msg_lower.contains("disconnected") {
            self.add("Input contains several disconnected fragments (salt or mixture)");
            self.add("Use --largest-fragment to keep only the main component");
        } else if msg_lower.contains("ring") {
            self.add("A ring bond is never closed or an aromatic atom is outside a ring");
            self.add("Check ring closure digits in the SMILES");
        } else if msg_lower.contains("valence") {
            self.add("An atom exceeds its allowed valence");
            self.add("Check explicit hydrogens and formal charges");
        } else if msg_lower.contains("empty") {
            self.add("Input structure contains no atoms");
        } else {
            self.add("The structure could not be parsed or sanitized");
            self.add("Check the input for typos");
        }
    }

    fn collect_pattern_hints(&mut self, msg: &str) {
        let msg_lower = msg.to_lowercase();

        if msg_lower.contains("version") {
            self.add(format!(
                "Set `version = {}` at the top of the table",
                pka_forge::PATTERN_TABLE_VERSION
            ));
        } else if msg_lower.contains("smarts") {
            self.add("Check the SMARTS syntax of the named pattern");
        } else if msg_lower.contains("site") {
            self.add("Site indices are 0-based positions of SMARTS atoms");
        } else {
            self.add("Each [[pattern]] needs name, polarity, smarts and sites");
        }
    }

    fn collect_fallback_hints(&mut self, err: &Error) {
        let msg = error_chain_text(err);

        if msg.contains("terminal") || msg.contains("stdin") {
            self.add("Pass SMILES as arguments, use -i/--input, or pipe data to stdin");
            return;
        }

        if msg.contains("device") {
            self.add("Valid devices: cpu, cuda, cuda:N, metal, metal:N");
            return;
        }

        if msg.contains("no such file") || msg.contains("not found") {
            self.add("Check that the file path is correct");
            self.add("Verify the file exists and is readable");
        }
    }
}

fn error_chain_text(err: &Error) -> String {
    err.chain()
        .map(|cause| cause.to_string())
        .collect::<Vec<_>>()
        .join("\n")
        .to_lowercase()
}

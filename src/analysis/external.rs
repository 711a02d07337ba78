use std::collections::{HashMap, HashSet};
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::sync::Arc;

use log::{debug, trace, warn};
use parking_lot::Mutex;
use serde::Deserialize;

use super::{Analysis, EntityIob, LinguisticAnalyzer, PosTag, Token};
use crate::errors::AnalysisError;
use crate::language_utils;

/// Texts written to the command before their answers are read back
///
/// Kept small so neither side of the pipes fills up while the other is writing.
const PREFETCH_CHUNK: usize = 16;

/// Token as printed by the analysis command
///
/// Offsets are character offsets, which is what spaCy's `token.idx` reports.
#[derive(Debug, Deserialize)]
struct ExternalToken {
    text: String,
    pos: String,
    #[serde(default)]
    tag: String,
    #[serde(default)]
    dep: String,
    idx: usize,
    #[serde(default)]
    head: Option<usize>,
    #[serde(default)]
    is_sent_end: bool,
    #[serde(default)]
    ent_iob: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ExternalOutput {
    Wrapped { tokens: Vec<ExternalToken> },
    Bare(Vec<ExternalToken>),
}

/// A running analysis command
///
/// Requests are JSON strings, one per line; answers come back one line each,
/// in order.
#[derive(Debug)]
struct AnalyzerSession {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

impl AnalyzerSession {
    fn start(command: &str, args: &[String]) -> Result<Self, AnalysisError> {
        let mut child = Command::new(command)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| AnalysisError::CommandFailed(format!("{}: {}", command, e)))?;

        let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(AnalysisError::CommandFailed(format!("{}: pipes unavailable", command)));
        };

        debug!("Started analysis command {} (pid {})", command, child.id());
        Ok(Self {
            child,
            stdin,
            stdout: BufReader::new(stdout),
        })
    }

    fn send(&mut self, text: &str) -> Result<(), AnalysisError> {
        let line = serde_json::to_string(text).map_err(|e| AnalysisError::CommandFailed(e.to_string()))?;
        writeln!(self.stdin, "{}", line).map_err(|e| AnalysisError::CommandFailed(e.to_string()))
    }

    fn flush(&mut self) -> Result<(), AnalysisError> {
        self.stdin.flush().map_err(|e| AnalysisError::CommandFailed(e.to_string()))
    }

    fn receive(&mut self) -> Result<String, AnalysisError> {
        let mut line = String::new();
        let read = self
            .stdout
            .read_line(&mut line)
            .map_err(|e| AnalysisError::CommandFailed(e.to_string()))?;
        if read == 0 {
            return Err(AnalysisError::CommandFailed("analysis command closed its output".to_string()));
        }
        Ok(line)
    }

    fn request(&mut self, text: &str) -> Result<String, AnalysisError> {
        self.send(text)?;
        self.flush()?;
        self.receive()
    }
}

impl Drop for AnalyzerSession {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

#[derive(Debug)]
struct FullAnalyzerState {
    command: String,
    args: Vec<String>,
    languages: Vec<String>,
    cache: Mutex<HashMap<String, Analysis>>,
    session: Mutex<Option<AnalyzerSession>>,
    // @field: Why the command cannot be used, once that is known
    unavailable: Mutex<Option<String>>,
}

/// Analyzer backed by an external statistical model
///
/// The command is started once and kept running for the life of the analyzer,
/// so the model loads a single time. Each request is the text encoded as a JSON
/// string on one line of stdin; the answer is one line of stdout holding a JSON
/// array of tokens (or an object with a `tokens` array). Results are cached per
/// text since the combiner analyzes the growing unit text repeatedly.
///
/// If the command cannot be started or stops answering, the analyzer reports
/// itself unavailable from then on without trying again.
///
/// Calls block on the command. `blocking_handle` lets async callers move them
/// to a blocking thread. Clones share the running command and the cache.
#[derive(Debug, Clone)]
pub struct FullAnalyzer {
    state: Arc<FullAnalyzerState>,
}

impl FullAnalyzer {
    pub fn new(command: impl Into<String>, args: Vec<String>, languages: Vec<String>) -> Self {
        Self {
            state: Arc::new(FullAnalyzerState {
                command: command.into(),
                args,
                languages,
                cache: Mutex::new(HashMap::new()),
                session: Mutex::new(None),
                unavailable: Mutex::new(None),
            }),
        }
    }

    /// Why the command is not used anymore, if it failed
    pub fn unavailable_reason(&self) -> Option<String> {
        self.state.unavailable.lock().clone()
    }

    fn mark_unavailable(&self, error: &AnalysisError) {
        let mut unavailable = self.state.unavailable.lock();
        if unavailable.is_none() {
            warn!(
                "{} analyzer unavailable, using heuristics for the rest of the run: {}",
                self.state.command, error
            );
            *unavailable = Some(error.to_string());
        }
    }

    /// Run `f` against the running command, starting it on first use
    fn with_session<T>(
        &self,
        f: impl FnOnce(&mut AnalyzerSession) -> Result<T, AnalysisError>,
    ) -> Result<T, AnalysisError> {
        if let Some(reason) = self.unavailable_reason() {
            return Err(AnalysisError::Unavailable(reason));
        }

        let mut session = self.state.session.lock();
        if session.is_none() {
            match AnalyzerSession::start(&self.state.command, &self.state.args) {
                Ok(started) => *session = Some(started),
                Err(e) => {
                    self.mark_unavailable(&e);
                    return Err(e);
                }
            }
        }

        let Some(running) = session.as_mut() else {
            return Err(AnalysisError::Unavailable(self.state.command.clone()));
        };
        let result = f(running);
        if let Err(e @ AnalysisError::CommandFailed(_)) = &result {
            *session = None;
            self.mark_unavailable(e);
        }
        result
    }

    fn cached(&self, text: &str) -> Option<Analysis> {
        self.state.cache.lock().get(text).cloned()
    }

    fn store(&self, text: &str, output: &str) -> Result<Analysis, AnalysisError> {
        let analysis = parse_output(text, output.trim_end())?;
        self.state.cache.lock().insert(text.to_string(), analysis.clone());
        Ok(analysis)
    }
}

/// Convert the command's output into an analysis of `text`
pub(crate) fn parse_output(text: &str, output: &str) -> Result<Analysis, AnalysisError> {
    let parsed: ExternalOutput =
        serde_json::from_str(output).map_err(|e| AnalysisError::InvalidOutput(e.to_string()))?;
    let external_tokens = match parsed {
        ExternalOutput::Wrapped { tokens } | ExternalOutput::Bare(tokens) => tokens,
    };

    // char offset -> byte offset, with one extra slot for the end of the text
    let byte_offsets: Vec<usize> = text
        .char_indices()
        .map(|(byte, _)| byte)
        .chain(std::iter::once(text.len()))
        .collect();

    let mut tokens = Vec::with_capacity(external_tokens.len());
    for external in external_tokens {
        let offset = *byte_offsets.get(external.idx).ok_or_else(|| {
            AnalysisError::InvalidOutput(format!("token offset {} is out of range", external.idx))
        })?;

        if !text[offset..].starts_with(&external.text) {
            return Err(AnalysisError::InvalidOutput(format!(
                "token '{}' does not match the text at offset {}",
                external.text, external.idx
            )));
        }

        tokens.push(Token {
            surface: external.text,
            pos: external.pos.parse().unwrap_or(PosTag::X),
            tag: external.tag,
            dep: external.dep,
            head: external.head,
            sentence_boundary: external.is_sent_end,
            offset,
            entity: EntityIob::from_marker(&external.ent_iob),
        });
    }

    Ok(Analysis::new(tokens))
}

impl LinguisticAnalyzer for FullAnalyzer {
    fn analyze(&self, text: &str) -> Result<Analysis, AnalysisError> {
        if let Some(cached) = self.cached(text) {
            trace!("Analysis cache hit ({} chars)", text.len());
            return Ok(cached);
        }

        let output = self.with_session(|session| session.request(text))?;
        let analysis = self.store(text, &output)?;
        debug!("Analyzed {} chars into {} tokens", text.len(), analysis.tokens.len());
        Ok(analysis)
    }

    fn prefetch(&self, texts: &[&str]) {
        let mut seen = HashSet::new();
        let pending: Vec<&str> = texts
            .iter()
            .copied()
            .filter(|text| seen.insert(*text) && self.cached(text).is_none())
            .collect();
        if pending.is_empty() {
            return;
        }

        for chunk in pending.chunks(PREFETCH_CHUNK) {
            let outputs = self.with_session(|session| {
                for text in chunk {
                    session.send(text)?;
                }
                session.flush()?;
                chunk.iter().map(|_| session.receive()).collect::<Result<Vec<_>, _>>()
            });

            let outputs = match outputs {
                Ok(outputs) => outputs,
                Err(e) => {
                    debug!("Prefetch stopped: {}", e);
                    return;
                }
            };
            for (text, output) in chunk.iter().zip(outputs) {
                if let Err(e) = self.store(text, &output) {
                    debug!("Discarding prefetched analysis: {}", e);
                }
            }
        }
        debug!("Prefetched analyses for {} texts", pending.len());
    }

    fn blocking_handle(&self) -> Option<Arc<dyn LinguisticAnalyzer>> {
        Some(Arc::new(self.clone()))
    }

    fn name(&self) -> &str {
        "full"
    }

    fn supports_language(&self, language: &str) -> bool {
        self.state.languages.is_empty()
            || self
                .state
                .languages
                .iter()
                .any(|supported| language_utils::language_codes_match(supported, language))
    }
}

//! Playwright-backed browser driver.
//!
//! `connect()` spawns a long-lived `node` child running an embedded driver
//! script. The script reads one JSON command per stdin line and answers one
//! JSON reply per stdout line; element handles are ids assigned by the
//! script. The child is killed when the session drops, so a crashed run
//! never leaks a browser process.

use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;
use tracing::debug;

use super::{BrowserDriver, BrowserSession, ElementId, PageHandle};
use crate::error::{ProbeError, ProbeResult};

/// Which Playwright browser engine to launch.
#[derive(Debug, Clone, Copy, Default)]
pub enum Browser {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl Browser {
    fn as_str(&self) -> &'static str {
        match self {
            Browser::Chromium => "chromium",
            Browser::Firefox => "firefox",
            Browser::Webkit => "webkit",
        }
    }
}

/// Driver script run inside the `node` child. One JSON command per stdin
/// line, one JSON reply per stdout line; failures carry a `kind` that maps
/// back onto the probe error taxonomy.
const DRIVER_SCRIPT: &str = r#"
const readline = require('readline');
const { chromium, firefox, webkit } = require('playwright');
const engines = { chromium, firefox, webkit };

(async () => {
  const engine = engines[process.argv[1]] || chromium;
  const headless = process.argv[2] !== 'false';
  const browser = await engine.launch({ headless });
  const context = await browser.newContext();
  let page = null;
  let elements = new Map();
  let nextId = 1;
  const reply = (obj) => process.stdout.write(JSON.stringify(obj) + '\n');

  reply({ ok: true, event: 'ready' });

  const rl = readline.createInterface({ input: process.stdin });
  for await (const line of rl) {
    let msg;
    try {
      msg = JSON.parse(line);
    } catch (e) {
      reply({ ok: false, kind: 'protocol', error: 'bad command: ' + e.message });
      continue;
    }
    try {
      switch (msg.cmd) {
        case 'open_page':
          page = await context.newPage();
          elements = new Map();
          await page.goto(msg.url);
          reply({ ok: true });
          break;
        case 'wait_load':
          await page.waitForLoadState('load');
          reply({ ok: true });
          break;
        case 'find': {
          const handle = await page.$(msg.identifier);
          if (!handle) {
            reply({ ok: false, kind: 'element_not_found', error: 'no element matches ' + msg.identifier });
            break;
          }
          const id = String(nextId++);
          elements.set(id, handle);
          reply({ ok: true, result: { element: id } });
          break;
        }
        case 'click':
          await elements.get(msg.element).click();
          reply({ ok: true });
          break;
        case 'type':
          await elements.get(msg.element).type(msg.value);
          reply({ ok: true });
          break;
        case 'close':
          reply({ ok: true });
          await browser.close();
          process.exit(0);
        default:
          reply({ ok: false, kind: 'config', error: 'unknown command ' + msg.cmd });
      }
    } catch (e) {
      const kind = msg.cmd === 'open_page' ? 'navigation' : 'interaction';
      reply({ ok: false, kind, error: e.message });
    }
  }
})().catch((e) => {
  process.stdout.write(JSON.stringify({ ok: false, kind: 'connection', error: e.message }) + '\n');
  process.exit(1);
});
"#;

/// Browser driver backed by Playwright via a Node subprocess.
#[derive(Debug, Clone)]
pub struct PlaywrightDriver {
    browser: Browser,
    headless: bool,
}

impl PlaywrightDriver {
    pub fn new(headless: bool) -> Self {
        Self {
            browser: Browser::default(),
            headless,
        }
    }

    pub fn with_browser(mut self, browser: Browser) -> Self {
        self.browser = browser;
        self
    }

    /// Verify a Playwright installation is reachable from this process.
    fn check_playwright_installed() -> ProbeResult<()> {
        let status = std::process::Command::new("npx")
            .args(["playwright", "--version"])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();

        match status {
            Ok(status) if status.success() => Ok(()),
            _ => Err(ProbeError::DriverConnection(
                "playwright not found; install with: npx playwright install".to_string(),
            )),
        }
    }
}

#[async_trait]
impl BrowserDriver for PlaywrightDriver {
    async fn connect(&self) -> ProbeResult<Box<dyn BrowserSession>> {
        Self::check_playwright_installed()?;

        let mut child = Command::new("node")
            .arg("-e")
            .arg(DRIVER_SCRIPT)
            .arg(self.browser.as_str())
            .arg(if self.headless { "true" } else { "false" })
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ProbeError::DriverConnection(format!("failed to spawn node: {e}")))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| ProbeError::DriverConnection("driver stdin unavailable".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ProbeError::DriverConnection("driver stdout unavailable".into()))?;

        let pipe = Arc::new(Mutex::new(Pipe {
            _child: child,
            stdin,
            lines: BufReader::new(stdout).lines(),
        }));

        // The script announces itself once the browser has launched.
        {
            let mut guard = pipe.lock().await;
            let ready = guard.read_reply().await?;
            if ready.get("event").and_then(Value::as_str) != Some("ready") {
                return Err(ProbeError::DriverConnection(format!(
                    "unexpected driver greeting: {ready}"
                )));
            }
        }
        debug!(browser = self.browser.as_str(), "playwright driver ready");

        Ok(Box::new(PlaywrightSession { pipe }))
    }
}

/// The Node child plus its pipes. Shared between the session and the page
/// handle it produced; access is sequential within a run, the mutex only
/// satisfies shared ownership.
struct Pipe {
    _child: Child,
    stdin: ChildStdin,
    lines: Lines<BufReader<ChildStdout>>,
}

impl Pipe {
    async fn send(&mut self, cmd: Value) -> ProbeResult<Value> {
        let mut line = serde_json::to_string(&cmd)?;
        line.push('\n');
        self.stdin.write_all(line.as_bytes()).await?;
        self.stdin.flush().await?;
        self.read_reply().await
    }

    async fn read_reply(&mut self) -> ProbeResult<Value> {
        let line = self
            .lines
            .next_line()
            .await?
            .ok_or_else(|| ProbeError::DriverConnection("driver process closed stdout".into()))?;
        parse_reply(&line)
    }
}

/// Parse one reply line, mapping failure kinds onto the error taxonomy.
fn parse_reply(line: &str) -> ProbeResult<Value> {
    let reply: Value = serde_json::from_str(line)
        .map_err(|e| ProbeError::Protocol(format!("unparseable driver reply: {e}")))?;

    if reply.get("ok").and_then(Value::as_bool) == Some(true) {
        return Ok(reply);
    }

    let message = reply
        .get("error")
        .and_then(Value::as_str)
        .unwrap_or("unknown driver error")
        .to_string();
    match reply.get("kind").and_then(Value::as_str) {
        Some("element_not_found") => Err(ProbeError::ElementNotFound {
            identifier: message
                .strip_prefix("no element matches ")
                .unwrap_or(&message)
                .to_string(),
        }),
        Some("navigation") | Some("connection") => Err(ProbeError::DriverConnection(message)),
        Some("config") => Err(ProbeError::Config(message)),
        _ => Err(ProbeError::Protocol(message)),
    }
}

struct PlaywrightSession {
    pipe: Arc<Mutex<Pipe>>,
}

#[async_trait]
impl BrowserSession for PlaywrightSession {
    async fn open_page(&mut self, url: &str) -> ProbeResult<Box<dyn PageHandle>> {
        self.pipe
            .lock()
            .await
            .send(json!({ "cmd": "open_page", "url": url }))
            .await?;
        Ok(Box::new(PlaywrightPage {
            pipe: Arc::clone(&self.pipe),
        }))
    }

    async fn close(&mut self) -> ProbeResult<()> {
        self.pipe.lock().await.send(json!({ "cmd": "close" })).await?;
        Ok(())
    }
}

struct PlaywrightPage {
    pipe: Arc<Mutex<Pipe>>,
}

#[async_trait]
impl PageHandle for PlaywrightPage {
    async fn wait_load(&mut self) -> ProbeResult<()> {
        self.pipe
            .lock()
            .await
            .send(json!({ "cmd": "wait_load" }))
            .await?;
        Ok(())
    }

    async fn find_element(&mut self, identifier: &str) -> ProbeResult<ElementId> {
        let reply = self
            .pipe
            .lock()
            .await
            .send(json!({ "cmd": "find", "identifier": identifier }))
            .await?;
        let id = reply
            .pointer("/result/element")
            .and_then(Value::as_str)
            .ok_or_else(|| ProbeError::Protocol("find reply missing element id".into()))?;
        Ok(ElementId(id.to_string()))
    }

    async fn click(&mut self, element: &ElementId) -> ProbeResult<()> {
        self.pipe
            .lock()
            .await
            .send(json!({ "cmd": "click", "element": element.0 }))
            .await?;
        Ok(())
    }

    async fn type_text(&mut self, element: &ElementId, value: &str) -> ProbeResult<()> {
        self.pipe
            .lock()
            .await
            .send(json!({ "cmd": "type", "element": element.0, "value": value }))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ok_reply() {
        let reply = parse_reply(r#"{"ok":true,"result":{"element":"3"}}"#).unwrap();
        assert_eq!(reply.pointer("/result/element").unwrap(), "3");
    }

    #[test]
    fn test_parse_element_not_found() {
        let err = parse_reply(r#"{"ok":false,"kind":"element_not_found","error":"no element matches #submit"}"#)
            .unwrap_err();
        match err {
            ProbeError::ElementNotFound { identifier } => assert_eq!(identifier, "#submit"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_parse_navigation_failure() {
        let err = parse_reply(r#"{"ok":false,"kind":"navigation","error":"net::ERR_NAME_NOT_RESOLVED"}"#)
            .unwrap_err();
        assert!(matches!(err, ProbeError::DriverConnection(_)));
    }

    #[test]
    fn test_parse_garbage_reply() {
        let err = parse_reply("not json at all").unwrap_err();
        assert!(matches!(err, ProbeError::Protocol(_)));
    }

    #[test]
    fn test_unknown_kind_is_protocol_error() {
        let err = parse_reply(r#"{"ok":false,"kind":"mystery","error":"huh"}"#).unwrap_err();
        assert!(matches!(err, ProbeError::Protocol(_)));
    }
}

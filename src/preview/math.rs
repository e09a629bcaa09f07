//! Math typesetting for the preview
//!
//! The typesetter sits behind [`MathTypesetter`] so the preview does not care
//! which engine draws formulas. The bundled [`UnicodeTypesetter`] parses LaTeX
//! with pulldown-latex, lays it out as MathML and then flattens that MathML
//! into Unicode text: scripts use the Unicode super/subscript ranges where
//! they exist, fractions become `a/b`, roots become `√`. It is a display aid
//! and makes no layout decisions. Parse errors are reported per formula.
//!
//! The engine is installed asynchronously; [`MathEngine`] tracks readiness
//! and gives up after a fixed ceiling.

use super::markup::{self, Element, Node};
use crate::error::MathError;
use pulldown_latex::{config::RenderConfig, mathml::push_mathml, Parser, Storage};
use regex::Regex;
use std::borrow::Cow;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

/// Relations and arrows drawn with a space on either side
const SPACED_OPERATORS: &[&str] = &[
    "=", "≠", "<", ">", "≤", "≥", "≈", "≡", "∼", "≅", "∝", "→", "←", "↔", "⇒", "⇐", "⇔", "↦", "∈",
    "∉", "⊂", "⊃", "⊆", "⊇",
];

/// A math typesetting backend
pub trait MathTypesetter: Send + Sync + std::fmt::Debug {
    /// Engine name for the status bar
    fn name(&self) -> &str;

    /// Render one formula body (without delimiters)
    fn typeset(&self, latex: &str) -> Result<String, MathError>;
}

/// Readiness of the typesetting engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MathEngineStatus {
    /// Nothing started yet
    Loading,
    /// Engine is being built
    Initializing,
    Ready,
    /// Gave up waiting
    Failed,
}

impl MathEngineStatus {
    pub fn display_name(&self) -> &'static str {
        match self {
            MathEngineStatus::Loading => "Math renderer loading...",
            MathEngineStatus::Initializing => "Math renderer initializing...",
            MathEngineStatus::Ready => "Math renderer ready",
            MathEngineStatus::Failed => "Math renderer failed to load",
        }
    }
}

/// Holder for the installed engine plus its readiness state
#[derive(Debug)]
pub struct MathEngine {
    status: MathEngineStatus,
    started: Instant,
    ceiling: Duration,
    engine: Option<Arc<dyn MathTypesetter>>,
}

impl MathEngine {
    pub fn new(ceiling: Duration) -> Self {
        Self::starting_at(Instant::now(), ceiling)
    }

    pub fn starting_at(started: Instant, ceiling: Duration) -> Self {
        Self {
            status: MathEngineStatus::Loading,
            started,
            ceiling,
            engine: None,
        }
    }

    pub fn begin_initialization(&mut self) {
        if self.status == MathEngineStatus::Loading {
            self.status = MathEngineStatus::Initializing;
        }
    }

    /// Install a ready engine. A late arrival after the ceiling is still
    /// accepted so later previews can use it.
    pub fn install(&mut self, engine: Arc<dyn MathTypesetter>) {
        log::info!("math engine '{}' ready", engine.name());
        self.engine = Some(engine);
        self.status = MathEngineStatus::Ready;
    }

    pub fn fail(&mut self, reason: &str) {
        log::error!("math engine failed: {}", reason);
        if self.engine.is_none() {
            self.status = MathEngineStatus::Failed;
        }
    }

    /// Readiness check driven by the poll timer
    pub fn poll(&mut self, now: Instant) -> MathEngineStatus {
        if self.engine.is_some() {
            self.status = MathEngineStatus::Ready;
        } else if self.is_polling() && now.duration_since(self.started) >= self.ceiling {
            log::warn!("math engine not ready after {:?}", self.ceiling);
            self.status = MathEngineStatus::Failed;
        }
        self.status
    }

    /// Whether the readiness poll should keep running
    pub fn is_polling(&self) -> bool {
        matches!(
            self.status,
            MathEngineStatus::Loading | MathEngineStatus::Initializing
        )
    }

    pub fn status(&self) -> MathEngineStatus {
        self.status
    }

    pub fn typesetter(&self) -> Option<Arc<dyn MathTypesetter>> {
        self.engine.clone()
    }
}

/// LaTeX to Unicode text typesetter
#[derive(Debug, Clone, Default)]
pub struct UnicodeTypesetter {
    /// User macros, command name (without backslash) to replacement text
    macros: HashMap<String, String>,
}

impl UnicodeTypesetter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_macros(macros: HashMap<String, String>) -> Self {
        let macros = macros
            .into_iter()
            .map(|(k, v)| (k.trim_start_matches('\\').to_string(), v))
            .collect();
        Self { macros }
    }

    /// Build the engine, reading user macros from `path` when it exists
    pub async fn load(path: Option<PathBuf>) -> Result<Self, String> {
        let Some(path) = path else {
            return Ok(Self::new());
        };
        match tokio::fs::read_to_string(&path).await {
            Ok(raw) => {
                let macros: HashMap<String, String> = serde_json::from_str(&raw)
                    .map_err(|e| format!("{}: {}", path.display(), e))?;
                log::debug!("loaded {} math macros from {}", macros.len(), path.display());
                Ok(Self::with_macros(macros))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::new()),
            Err(e) => Err(format!("{}: {}", path.display(), e)),
        }
    }

    /// Substitute user macros. Commands without a macro pass through.
    fn expand_macros<'a>(&self, latex: &'a str) -> Cow<'a, str> {
        if self.macros.is_empty() {
            return Cow::Borrowed(latex);
        }
        command_re().replace_all(latex, |caps: &regex::Captures| {
            self.macros
                .get(&caps[1])
                .cloned()
                .unwrap_or_else(|| caps[0].to_string())
        })
    }
}

impl MathTypesetter for UnicodeTypesetter {
    fn name(&self) -> &str {
        "unicode"
    }

    fn typeset(&self, latex: &str) -> Result<String, MathError> {
        if latex.trim().is_empty() {
            return Err(MathError::Empty);
        }
        let source = self.expand_macros(latex);

        let storage = Storage::new();
        let events: Vec<_> = Parser::new(&source, &storage).collect();
        let errors: Vec<String> = events
            .iter()
            .filter_map(|e| e.as_ref().err().map(|err| err.to_string()))
            .collect();
        if !errors.is_empty() {
            return Err(MathError::Parse(errors.join("; ")));
        }

        let mut mathml = String::new();
        push_mathml(&mut mathml, events.into_iter(), RenderConfig::default())
            .map_err(|e| MathError::Render(e.to_string()))?;

        let text = mathml_to_unicode(&mathml);
        if text.is_empty() {
            return Err(MathError::Empty);
        }
        Ok(text)
    }
}

/// Flatten a MathML fragment into one line of Unicode text
fn mathml_to_unicode(mathml: &str) -> String {
    let out: String = markup::parse(mathml).iter().map(render_node).collect();
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn render_node(node: &Node) -> String {
    match node {
        Node::Element(el) => render_element(el),
        // whitespace between layout elements
        Node::Text(_) => String::new(),
    }
}

fn render_element(el: &Element) -> String {
    match el.name.as_str() {
        "mi" | "mn" | "ms" | "mtext" => return clean(&el.text()),
        "mo" => return operator(&clean(&el.text())),
        "mspace" => return " ".to_string(),
        "annotation" | "annotation-xml" | "mphantom" => return String::new(),
        _ => {}
    }

    let args: Vec<String> = el.elements().map(render_element).collect();
    let arg = |i: usize| args.get(i).map(String::as_str).unwrap_or_default();
    match el.name.as_str() {
        "mfrac" => fraction(arg(0), arg(1)),
        "msqrt" => format!("√{}", wrap(&args.concat())),
        "mroot" => root(arg(0), arg(1)),
        "msup" => format!("{}{}", arg(0), superscript(arg(1))),
        "msub" | "munder" => format!("{}{}", arg(0), subscript(arg(1))),
        "msubsup" | "munderover" => {
            format!("{}{}{}", arg(0), subscript(arg(1)), superscript(arg(2)))
        }
        "mover" => overscript(arg(0), arg(1)),
        "mtable" => args.join("; "),
        "mtr" | "mlabeledtr" => args.join(", "),
        _ => args.concat(),
    }
}

/// Drop invisible operators and normalise no-break spaces
fn clean(text: &str) -> String {
    text.chars()
        .filter(|c| !matches!(c, '\u{2061}'..='\u{2064}' | '\u{200b}'))
        .map(|c| if c == '\u{a0}' { ' ' } else { c })
        .collect()
}

fn operator(op: &str) -> String {
    if SPACED_OPERATORS.contains(&op.trim()) {
        format!(" {} ", op.trim())
    } else {
        op.to_string()
    }
}

fn root(base: &str, index: &str) -> String {
    let sign = match index.trim() {
        "" | "2" => "√".to_string(),
        "3" => "∛".to_string(),
        "4" => "∜".to_string(),
        other => format!("{}√", superscript(other)),
    };
    format!("{}{}", sign, wrap(base))
}

/// Accents over a single symbol become combining marks
fn overscript(base: &str, mark: &str) -> String {
    let combining = match mark.trim() {
        "^" | "ˆ" => Some('\u{302}'),
        "~" | "˜" => Some('\u{303}'),
        "¯" | "‾" | "_" => Some('\u{304}'),
        "˙" | "." => Some('\u{307}'),
        "¨" => Some('\u{308}'),
        "→" | "⃗" => Some('\u{20d7}'),
        _ => None,
    };
    match combining {
        Some(c) if base.chars().count() == 1 => format!("{}{}", base, c),
        _ => format!("{}{}", base, superscript(mark.trim())),
    }
}

fn wrap(expr: &str) -> String {
    if expr.chars().count() <= 1 {
        expr.to_string()
    } else {
        format!("({})", expr)
    }
}

fn fraction(num: &str, den: &str) -> String {
    let vulgar = match (num.trim(), den.trim()) {
        ("1", "2") => Some("½"),
        ("1", "3") => Some("⅓"),
        ("2", "3") => Some("⅔"),
        ("1", "4") => Some("¼"),
        ("3", "4") => Some("¾"),
        ("1", "5") => Some("⅕"),
        ("1", "6") => Some("⅙"),
        ("1", "8") => Some("⅛"),
        _ => None,
    };
    match vulgar {
        Some(v) => v.to_string(),
        None => format!("{}/{}", wrap(num), wrap(den)),
    }
}

fn superscript(text: &str) -> String {
    let text: String = text.split_whitespace().collect();
    let mapped: Option<String> = text.chars().map(superscript_char).collect();
    mapped.unwrap_or_else(|| format!("^{}", wrap(&text)))
}

fn subscript(text: &str) -> String {
    let text: String = text.split_whitespace().collect();
    let mapped: Option<String> = text.chars().map(subscript_char).collect();
    mapped.unwrap_or_else(|| format!("_{}", wrap(&text)))
}

fn superscript_char(c: char) -> Option<char> {
    Some(match c {
        '0' => '⁰',
        '1' => '¹',
        '2' => '²',
        '3' => '³',
        '4' => '⁴',
        '5' => '⁵',
        '6' => '⁶',
        '7' => '⁷',
        '8' => '⁸',
        '9' => '⁹',
        '+' => '⁺',
        '-' => '⁻',
        '=' => '⁼',
        '(' => '⁽',
        ')' => '⁾',
        'a' => 'ᵃ',
        'b' => 'ᵇ',
        'c' => 'ᶜ',
        'd' => 'ᵈ',
        'e' => 'ᵉ',
        'f' => 'ᶠ',
        'g' => 'ᵍ',
        'h' => 'ʰ',
        'i' => 'ⁱ',
        'j' => 'ʲ',
        'k' => 'ᵏ',
        'l' => 'ˡ',
        'm' => 'ᵐ',
        'n' => 'ⁿ',
        'o' => 'ᵒ',
        'p' => 'ᵖ',
        'r' => 'ʳ',
        's' => 'ˢ',
        't' => 'ᵗ',
        'u' => 'ᵘ',
        'v' => 'ᵛ',
        'w' => 'ʷ',
        'x' => 'ˣ',
        'y' => 'ʸ',
        'z' => 'ᶻ',
        '′' => '′',
        _ => return None,
    })
}

fn subscript_char(c: char) -> Option<char> {
    Some(match c {
        '0' => '₀',
        '1' => '₁',
        '2' => '₂',
        '3' => '₃',
        '4' => '₄',
        '5' => '₅',
        '6' => '₆',
        '7' => '₇',
        '8' => '₈',
        '9' => '₉',
        '+' => '₊',
        '-' => '₋',
        '=' => '₌',
        '(' => '₍',
        ')' => '₎',
        'a' => 'ₐ',
        'e' => 'ₑ',
        'h' => 'ₕ',
        'i' => 'ᵢ',
        'j' => 'ⱼ',
        'k' => 'ₖ',
        'l' => 'ₗ',
        'm' => 'ₘ',
        'n' => 'ₙ',
        'o' => 'ₒ',
        'p' => 'ₚ',
        'r' => 'ᵣ',
        's' => 'ₛ',
        't' => 'ₜ',
        'u' => 'ᵤ',
        'v' => 'ᵥ',
        'x' => 'ₓ',
        _ => return None,
    })
}


fn command_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\\([A-Za-z]+)").expect("command pattern"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(latex: &str) -> Result<String, MathError> {
        UnicodeTypesetter::new().typeset(latex)
    }

    #[test]
    fn test_scripts_and_symbols() {
        assert_eq!(ts("x^2").unwrap(), "x²");
        assert_eq!(ts("\\alpha").unwrap(), "α");
        assert_eq!(ts("e^{i\\pi}").unwrap(), "e^(iπ)");
    }

    #[test]
    fn test_fractions_and_roots() {
        assert_eq!(ts("\\frac{1}{2}").unwrap(), "½");
        assert_eq!(ts("\\frac{a+b}{c}").unwrap(), "(a+b)/c");
        assert_eq!(ts("\\sqrt{x}").unwrap(), "√x");
        assert_eq!(ts("\\sqrt[3]{x}").unwrap(), "∛x");
    }

    #[test]
    fn test_relations_are_spaced() {
        assert_eq!(ts("\\alpha \\leq \\beta").unwrap(), "α ≤ β");
    }

    #[test]
    fn test_parse_errors_are_reported() {
        assert!(matches!(ts("\\frac{a"), Err(MathError::Parse(_))));
        assert!(matches!(ts("\\notacommand"), Err(MathError::Parse(_))));
        assert_eq!(ts("   "), Err(MathError::Empty));
    }

    #[test]
    fn test_user_macros() {
        let mut macros = HashMap::new();
        macros.insert("\\half".to_string(), "\\frac{1}{2}".to_string());
        let engine = UnicodeTypesetter::with_macros(macros);
        assert!(engine.typeset("x + \\half").unwrap().ends_with('½'));
        assert_eq!(engine.expand_macros("\\halfway"), "\\halfway");
    }

    #[test]
    fn test_mathml_layout_elements() {
        assert_eq!(
            mathml_to_unicode(
                "<math><mfrac><mrow><mi>a</mi><mo>+</mo><mi>b</mi></mrow><mi>c</mi></mfrac></math>"
            ),
            "(a+b)/c"
        );
        assert_eq!(
            mathml_to_unicode(
                "<math><munderover><mo>∑</mo><mrow><mi>i</mi><mo>=</mo><mn>0</mn></mrow><mi>n</mi></munderover><msub><mi>x</mi><mi>i</mi></msub></math>"
            ),
            "∑ᵢ₌₀ⁿxᵢ"
        );
        assert_eq!(
            mathml_to_unicode("<math><mover><mi>x</mi><mo>^</mo></mover></math>"),
            "x\u{302}"
        );
        assert_eq!(
            mathml_to_unicode(
                "<math><mtable><mtr><mtd><mn>1</mn></mtd><mtd><mn>0</mn></mtd></mtr><mtr><mtd><mn>0</mn></mtd><mtd><mn>1</mn></mtd></mtr></mtable></math>"
            ),
            "1, 0; 0, 1"
        );
    }

    #[test]
    fn test_invisible_operators_dropped() {
        assert_eq!(
            mathml_to_unicode("<math><mi>sin</mi><mo>&#x2061;</mo><mi>x</mi></math>"),
            "sinx"
        );
    }

    #[test]
    fn test_engine_poll_times_out() {
        let start = Instant::now();
        let mut engine = MathEngine::starting_at(start, Duration::from_secs(10));
        engine.begin_initialization();
        assert_eq!(
            engine.poll(start + Duration::from_secs(5)),
            MathEngineStatus::Initializing
        );
        assert_eq!(
            engine.poll(start + Duration::from_secs(10)),
            MathEngineStatus::Failed
        );
        assert!(!engine.is_polling());
    }

    #[test]
    fn test_engine_ready_after_install() {
        let start = Instant::now();
        let mut engine = MathEngine::starting_at(start, Duration::from_secs(10));
        engine.install(Arc::new(UnicodeTypesetter::new()));
        assert_eq!(engine.poll(start), MathEngineStatus::Ready);
        assert!(engine.typesetter().is_some());
    }

    #[tokio::test]
    async fn test_load_without_macro_file() {
        let engine = UnicodeTypesetter::load(Some(PathBuf::from("/nonexistent/macros.json")))
            .await
            .unwrap();
        assert_eq!(engine.typeset("\\pi").unwrap(), "π");
    }
}

//! Heuristics deciding which non-framework calls are worth recording as
//! internal calls. The goal is to keep calls into the application's own code
//! and drop standard-library and logging noise.

/// Go builtins and predeclared types usable as conversions.
const GO_BUILTINS: &[&str] = &[
    "append", "cap", "clear", "close", "complex", "copy", "delete", "imag", "len", "make", "max",
    "min", "new", "panic", "print", "println", "real", "recover", "any", "bool", "byte",
    "complex64", "complex128", "error", "float32", "float64", "int", "int8", "int16", "int32",
    "int64", "rune", "string", "uint", "uint8", "uint16", "uint32", "uint64", "uintptr",
];

/// Standard-library and ubiquitous utility packages.
const BORING_PACKAGES: &[&str] = &[
    "fmt", "strings", "strconv", "errors", "time", "sort", "slices", "maps", "math", "bytes",
    "json", "xml", "os", "io", "ioutil", "bufio", "sync", "atomic", "context", "log", "slog",
    "filepath", "path", "regexp", "reflect", "rand", "hex", "base64", "utf8", "unicode", "http",
    "url", "zap", "logrus", "uuid", "assert", "require",
];

/// Logging-style method names.
const LOGGING_METHODS: &[&str] = &[
    "Debug", "Debugf", "Debugw", "Info", "Infof", "Infow", "Warn", "Warnf", "Warnw", "Warning",
    "Errorf", "Errorw", "Fatal", "Fatalf", "Panic", "Panicf", "Print", "Printf", "Println", "Log",
    "Logf", "Trace", "Tracef", "With", "WithField", "WithFields", "WithError", "Sugar", "Named",
];

/// Context accessors and constructors.
const CONTEXT_METHODS: &[&str] = &[
    "Value",
    "Done",
    "Err",
    "Deadline",
    "WithValue",
    "WithCancel",
    "WithTimeout",
    "WithDeadline",
    "Background",
    "TODO",
];

/// Error-handling methods; anything starting with `Wrap` is also dropped.
const ERROR_METHODS: &[&str] = &["Error", "Unwrap", "Is", "As"];

/// Receiver names that usually denote a method on one of the module's own types.
const LOCAL_RECEIVERS: &[&str] = &[
    "self", "this", "srv", "svc", "service", "handler", "repo", "store",
];

pub fn is_builtin(name: &str) -> bool {
    GO_BUILTINS.contains(&name)
}

/// First identifier of a receiver expression: `s.repo` -> `s`, `(*h)` -> `h`.
pub fn receiver_root(receiver: &str) -> &str {
    let trimmed = receiver.trim_start_matches(['(', '*', '&']);
    let end = trimmed
        .find(|c: char| !(c.is_alphanumeric() || c == '_'))
        .unwrap_or(trimmed.len());
    &trimmed[..end]
}

/// True when `receiver.method()` is noise that should not become an internal call.
pub fn is_boring_call(receiver: &str, method: &str) -> bool {
    let root = receiver_root(receiver);
    BORING_PACKAGES.contains(&root)
        || LOGGING_METHODS.contains(&method)
        || CONTEXT_METHODS.contains(&method)
        || ERROR_METHODS.contains(&method)
        || method.starts_with("Wrap")
}

/// Receiver naming suggests the method lives on a type in the analyzed module.
pub fn is_likely_local_receiver(receiver: &str) -> bool {
    let root = receiver_root(receiver);
    (root.chars().count() == 1 && root.chars().all(|c| c.is_alphabetic()))
        || LOCAL_RECEIVERS.contains(&root)
}

// src/contract/languages.rs
//! Code block languages accepted by the Notion API.

/// Every `language` value the Notion API accepts for a code block.
pub const NOTION_CODE_LANGUAGES: &[&str] = &[
    "abap",
    "arduino",
    "bash",
    "basic",
    "c",
    "clojure",
    "coffeescript",
    "c++",
    "c#",
    "css",
    "dart",
    "diff",
    "docker",
    "elixir",
    "elm",
    "erlang",
    "flow",
    "fortran",
    "f#",
    "gherkin",
    "glsl",
    "go",
    "graphql",
    "groovy",
    "haskell",
    "html",
    "java",
    "javascript",
    "json",
    "julia",
    "kotlin",
    "latex",
    "less",
    "lisp",
    "livescript",
    "lua",
    "makefile",
    "markdown",
    "markup",
    "matlab",
    "mermaid",
    "nix",
    "objective-c",
    "ocaml",
    "pascal",
    "perl",
    "php",
    "plain text",
    "powershell",
    "prolog",
    "protobuf",
    "python",
    "r",
    "reason",
    "ruby",
    "rust",
    "sass",
    "scala",
    "scheme",
    "scss",
    "shell",
    "sql",
    "swift",
    "typescript",
    "vb.net",
    "verilog",
    "vhdl",
    "visual basic",
    "webassembly",
    "xml",
    "yaml",
    "java/c/c++/c#",
];

pub const PLAIN_TEXT: &str = "plain text";

pub fn is_known_language(language: &str) -> bool {
    NOTION_CODE_LANGUAGES.contains(&language)
}

/// Maps a fence info string (`rs`, `Python`, `yml`, ...) to a Notion language.
/// Anything unrecognized becomes `plain text`.
pub fn normalize_language(info: &str) -> &'static str {
    let tag = info
        .split_whitespace()
        .next()
        .unwrap_or("")
        .trim_matches(|c| c == '{' || c == '}' || c == '.')
        .to_ascii_lowercase();

    let alias = match tag.as_str() {
        "" | "text" | "txt" | "plain" | "plaintext" => PLAIN_TEXT,
        "rs" => "rust",
        "py" | "python3" => "python",
        "js" | "jsx" | "node" | "mjs" => "javascript",
        "ts" | "tsx" => "typescript",
        "sh" | "zsh" | "console" | "shell-session" => "shell",
        "cpp" | "cxx" | "hpp" => "c++",
        "cs" | "csharp" => "c#",
        "fs" | "fsharp" => "f#",
        "yml" => "yaml",
        "dockerfile" => "docker",
        "md" => "markdown",
        "golang" => "go",
        "kt" | "kts" => "kotlin",
        "rb" => "ruby",
        "ps1" | "pwsh" => "powershell",
        "tex" => "latex",
        "proto" => "protobuf",
        "objc" => "objective-c",
        "make" | "mk" => "makefile",
        "htm" => "html",
        "patch" => "diff",
        "wasm" | "wat" => "webassembly",
        "vb" => "visual basic",
        "ex" | "exs" => "elixir",
        "erl" => "erlang",
        "hs" => "haskell",
        "ml" => "ocaml",
        "pl" => "perl",
        "clj" => "clojure",
        "gql" => "graphql",
        other => {
            return NOTION_CODE_LANGUAGES
                .iter()
                .copied()
                .find(|known| *known == other)
                .unwrap_or(PLAIN_TEXT);
        }
    };
    alias
}

//! Doctor command - verify system requirements and configuration.

use crate::cli::{preflight, Output};
use crate::config::{LlmSettings, Settings};
use console::style;
use std::process::Command;

/// Check result for a single item.
#[derive(Debug)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, PartialEq)]
pub enum CheckStatus {
    Ok,
    Warning,
    Error,
}

impl CheckResult {
    fn ok(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Ok,
            message: message.to_string(),
            hint: None,
        }
    }

    fn warning(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Warning,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn error(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Error,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn print(&self) {
        let icon = match self.status {
            CheckStatus::Ok => style("✓").green(),
            CheckStatus::Warning => style("!").yellow(),
            CheckStatus::Error => style("✗").red(),
        };

        println!("  {} {} - {}", icon, style(&self.name).bold(), self.message);

        if let Some(hint) = &self.hint {
            println!("    {} {}", style("→").dim(), style(hint).dim());
        }
    }
}

/// Run all diagnostic checks.
pub fn run_doctor(settings: &Settings) -> anyhow::Result<()> {
    Output::header("Scenecast Doctor");
    println!();
    println!("Checking system requirements and configuration...\n");

    let mut checks = Vec::new();

    // Check external tools
    println!("{}", style("External Tools").bold());
    let render = &settings.render;
    let tool_checks = vec![
        check_tool("manim", &render.manim, install_hint_manim()),
        check_tool("ffmpeg", &render.ffmpeg, install_hint_ffmpeg()),
        check_tool("ffprobe", &render.ffprobe, install_hint_ffmpeg()),
        check_tool("text-to-speech", &render.tts, "Install with: pip install gTTS"),
    ];
    for check in &tool_checks {
        check.print();
    }
    checks.extend(tool_checks);
    Output::kv("Output naming", &render.output_naming.to_string());

    println!();

    // Check API key and models
    println!("{}", style("API Configuration").bold());
    let api_check = check_api_key(&settings.llm);
    api_check.print();
    checks.push(api_check);
    Output::kv("Endpoint", &settings.llm.api_base);
    Output::kv("Agent model", &settings.llm.model);
    Output::kv("Script model", settings.generator_model());

    println!();

    // Check directories
    println!("{}", style("Directories").bold());
    let dir_check = check_work_dir(settings);
    dir_check.print();
    checks.push(dir_check);

    println!();

    // Check configuration
    println!("{}", style("Configuration").bold());
    let config_check = check_config_file();
    config_check.print();
    checks.push(config_check);

    println!();

    // Summary
    let errors = checks.iter().filter(|c| c.status == CheckStatus::Error).count();
    let warnings = checks.iter().filter(|c| c.status == CheckStatus::Warning).count();

    if errors > 0 {
        Output::error(&format!(
            "{} error(s) found. Videos cannot be produced until they are fixed.",
            errors
        ));
        std::process::exit(1);
    } else if warnings > 0 {
        Output::warning(&format!("All checks passed with {} warning(s).", warnings));
    } else {
        Output::success("All checks passed! Scenecast is ready to use.");
    }

    Ok(())
}

/// Check if an external tool is available.
fn check_tool(name: &str, program: &str, hint: &str) -> CheckResult {
    let label = if name == program {
        name.to_string()
    } else {
        format!("{} ({})", name, program)
    };

    match Command::new(program).arg(preflight::version_arg(program)).output() {
        Ok(output) if output.status.success() => {
            let version = String::from_utf8_lossy(&output.stdout)
                .lines()
                .next()
                .unwrap_or("installed")
                .trim()
                .to_string();

            let version_display = if version.chars().count() > 50 {
                format!("{}...", version.chars().take(50).collect::<String>())
            } else if version.is_empty() {
                "installed".to_string()
            } else {
                version
            };

            CheckResult::ok(&label, &version_display)
        }
        Ok(_) => CheckResult::error(&label, "installed but not working", hint),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            CheckResult::error(&label, "not found", hint)
        }
        Err(e) => CheckResult::error(&label, &format!("error: {}", e), hint),
    }
}

/// Check that the API key variable is set.
fn check_api_key(llm: &LlmSettings) -> CheckResult {
    let name = llm.api_key_env.as_str();
    let hint = format!("Set with: export {}='...'", name);

    match std::env::var(name) {
        Ok(key) if key.trim().is_empty() => CheckResult::error(name, "empty", &hint),
        Ok(key) if key.chars().count() > 12 => {
            let chars: Vec<char> = key.chars().collect();
            let head: String = chars[..6].iter().collect();
            let tail: String = chars[chars.len() - 4..].iter().collect();
            CheckResult::ok(name, &format!("configured ({}...{})", head, tail))
        }
        Ok(_) => CheckResult::warning(name, "set but looks too short", &hint),
        Err(_) => CheckResult::error(name, "not set", &hint),
    }
}

/// Check the working directory videos are written to.
fn check_work_dir(settings: &Settings) -> CheckResult {
    let work_dir = settings.work_dir();
    if work_dir.is_dir() {
        CheckResult::ok("Working directory", &format!("{}", work_dir.display()))
    } else {
        CheckResult::warning(
            "Working directory",
            &format!("{} (will be created)", work_dir.display()),
            "Directory will be created on first run",
        )
    }
}

/// Check if config file exists.
fn check_config_file() -> CheckResult {
    let config_path = Settings::default_config_path();
    if config_path.exists() {
        CheckResult::ok("Config file", &format!("{}", config_path.display()))
    } else {
        CheckResult::warning(
            "Config file",
            "using defaults",
            "Create with: scenecast config init",
        )
    }
}

/// Install hint for Manim.
fn install_hint_manim() -> &'static str {
    if cfg!(target_os = "macos") {
        "Install with: brew install py3cairo ffmpeg && pip install manim"
    } else {
        "Install with: pip install manim (see https://docs.manim.community)"
    }
}

/// Platform-specific install hint for ffmpeg.
fn install_hint_ffmpeg() -> &'static str {
    if cfg!(target_os = "macos") {
        "Install with: brew install ffmpeg"
    } else if cfg!(target_os = "linux") {
        "Install with: sudo apt install ffmpeg (or your package manager)"
    } else {
        "Install from: https://ffmpeg.org/download.html"
    }
}

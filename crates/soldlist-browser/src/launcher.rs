use crate::{Error, Result};
use rand::seq::SliceRandom;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};

/// Desktop user agents, one picked at random per launch
pub const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/74.0.3729.169 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; WOW64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/72.0.3626.121 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/74.0.3729.157 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/60.0.3112.113 Safari/537.36",
];

pub const DEFAULT_DEBUGGING_PORT: u16 = 9222;

/// Browser behaviour requested for a run.
#[derive(Debug, Clone, Default)]
pub struct LaunchOptions {
    pub headless: bool,
    pub incognito: bool,
    /// Unpacked extension directory to load
    pub extension: Option<PathBuf>,
}

impl LaunchOptions {
    /// Whether a persistent profile can be used with these options.
    ///
    /// Incognito windows ignore profiles, and headless Chrome cannot load
    /// extensions from a profile, so an explicit extension wins there.
    pub fn uses_profile(&self) -> bool {
        !self.incognito && (!self.headless || self.extension.is_none())
    }
}

/// Builds the Chrome command line and starts the process
pub struct ChromeLauncher {
    chrome_path: PathBuf,
    profile_path: PathBuf,
    options: LaunchOptions,
    user_agent: &'static str,
    debugging_port: u16,
}

impl ChromeLauncher {
    pub fn new(chrome_path: PathBuf, profile_path: PathBuf, options: LaunchOptions) -> Self {
        Self {
            chrome_path,
            profile_path,
            options,
            user_agent: random_user_agent(),
            debugging_port: DEFAULT_DEBUGGING_PORT,
        }
    }

    pub fn with_debugging_port(mut self, port: u16) -> Self {
        self.debugging_port = port;
        self
    }

    /// Launch the Chrome process
    pub fn launch(&self) -> Result<Child> {
        let args = self.build_args();
        tracing::debug!("Launching {} {}", self.chrome_path.display(), args.join(" "));

        Command::new(&self.chrome_path)
            .args(&args)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| Error::Browser(format!("Failed to launch Chrome: {}", e)))
    }

    fn build_args(&self) -> Vec<String> {
        let mut args = vec![
            format!("--remote-debugging-port={}", self.debugging_port),
            "--no-first-run".to_string(),
            "--no-default-browser-check".to_string(),
            format!("--user-data-dir={}", self.profile_path.display()),
            format!("--user-agent={}", self.user_agent),
            "--lang=ja".to_string(),
            "--disable-gpu".to_string(),
            "--no-sandbox".to_string(),
            "--log-level=3".to_string(),
            "--ignore-ssl-errors".to_string(),
            "--ignore-certificate-errors".to_string(),
            "--allow-running-insecure-content".to_string(),
            "--disable-web-security".to_string(),
            "--disable-desktop-notifications".to_string(),
            "--disable-application-cache".to_string(),
            "--start-maximized".to_string(),
        ];

        if self.options.headless {
            args.push("--headless=new".to_string());
        }

        match &self.options.extension {
            Some(extension) => args.push(format!("--load-extension={}", extension.display())),
            None => args.push("--disable-extensions".to_string()),
        }

        if self.options.incognito {
            args.push("--incognito".to_string());
        }

        args.push("about:blank".to_string());
        args
    }

    pub fn debugging_port(&self) -> u16 {
        self.debugging_port
    }

    pub fn user_agent(&self) -> &str {
        self.user_agent
    }
}

fn random_user_agent() -> &'static str {
    USER_AGENTS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(USER_AGENTS[0])
}

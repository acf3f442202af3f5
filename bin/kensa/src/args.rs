use std::path::PathBuf;

use fake_user_agent::get_chrome_rua;
use kensa::HttpConfig;

#[derive(clap::Parser, Debug, Clone)]
#[clap(version, about)]
pub struct KensaArgs {
    /// Debug output
    #[clap(short, long, alias = "debug")]
    pub verbose: bool,

    /// Configuration file
    ///
    /// Defaults to kensa.toml in the working directory, if it exists.
    #[clap(short, long, env = "KENSA_CONFIG")]
    pub config: Option<PathBuf>,

    /// Timeout seconds for the manifest and time requests.
    /// Defaults to 5 seconds.
    #[clap(long)]
    pub timeout: Option<u64>,

    /// Cookies used to download the manifest, eg. "session=abc; region=eu"
    #[clap(long)]
    pub cookies: Option<String>,

    /// HTTP Header used for every request
    ///
    /// Custom header. eg. "Referer: https://example.com/". Can be repeated.
    #[clap(short = 'H', long = "header")]
    pub headers: Vec<String>,

    /// User agent. Defaults to a recent Chrome user agent.
    #[clap(long)]
    pub user_agent: Option<String>,

    /// Print every notice of a run as JSON on stdout
    #[clap(long)]
    pub json: bool,

    /// Keep validating after every manifest refresh until interrupted
    #[clap(short, long)]
    pub watch: bool,

    /// Manifest URL
    pub url: String,
}

impl KensaArgs {
    /// Apply command line overrides on top of the configuration file.
    pub fn http_config(&self, mut config: HttpConfig) -> HttpConfig {
        if let Some(timeout) = self.timeout {
            config.timeout_secs = timeout;
        }
        if let Some(user_agent) = &self.user_agent {
            config.user_agent = Some(user_agent.clone());
        }
        if config.user_agent.is_none() {
            config.user_agent = Some(get_chrome_rua().to_string());
        }

        config.headers.extend(self.headers.iter().cloned());
        if let Some(cookies) = &self.cookies {
            config.cookies.extend(
                cookies
                    .split(';')
                    .map(str::trim)
                    .filter(|cookie| !cookie.is_empty())
                    .map(str::to_string),
            );
        }
        config
    }
}

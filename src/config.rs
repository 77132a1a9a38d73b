use clap::Parser;
use std::path::PathBuf;

use crate::corrector::RuleTable;
use crate::error::Result;

/// Server settings, read from the command line or the environment
#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "ThinkFast autocorrect server", long_about = None)]
pub struct Config {
    /// Address to listen on
    #[arg(short, long, env = "THINKFAST_BIND", default_value = "0.0.0.0:8000")]
    pub bind: String,

    /// JSON file holding misspelling counts and typing speed history
    #[arg(short, long, env = "THINKFAST_DATA_FILE", default_value = "user_data.json")]
    pub data_file: PathBuf,

    /// Directory served under /static
    #[arg(short, long, env = "THINKFAST_STATIC_DIR", default_value = "static")]
    pub static_dir: PathBuf,

    /// Directory of *.hbs files overriding the built-in page templates
    #[arg(short, long, env = "THINKFAST_TEMPLATES_DIR")]
    pub templates_dir: Option<PathBuf>,

    /// JSON rule table replacing the built-in substitutions
    #[arg(short, long, env = "THINKFAST_RULES")]
    pub rules: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8000".to_string(),
            data_file: PathBuf::from("user_data.json"),
            static_dir: PathBuf::from("static"),
            templates_dir: None,
            rules: None,
        }
    }
}

impl Config {
    /// Rule table from `--rules`, or the built-in one
    pub fn rule_table(&self) -> Result<RuleTable> {
        match &self.rules {
            Some(path) => RuleTable::from_file(path),
            None => Ok(RuleTable::default()),
        }
    }
}

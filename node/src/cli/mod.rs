pub mod lens;
pub mod queue;
pub mod reconcile;

pub use lens::*;
pub use queue::*;
pub use reconcile::*;

use anyhow::bail;
use clap::{Parser, Subcommand};
use figment::{
    providers::{Format, Json, Serialized, Toml, Yaml},
    Figment,
};
use lp_optimistic::Attachment;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use url::Url;

#[derive(Parser, Debug)]
#[command(
    name = "lensq",
    about = "Lensq - reconciles optimistic Lens publications with the indexer",
    after_help = "Examples:\n  \
    lensq enqueue --tx-id 0d3f... --content \"gm\"\n  \
    lensq run --profile-id 0x15\n  \
    lensq run --config-file lensq.toml"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Poll every pending transaction until it is indexed or dropped
    Run {
        #[command(flatten)]
        run_command: Box<RunCmd>,
    },
    /// Add a pending transaction to the queue
    Enqueue {
        #[command(flatten)]
        enqueue_command: EnqueueCmd,
    },
    /// Show the pending transactions the way they are rendered
    List {
        #[command(flatten)]
        list_command: ListCmd,
    },
}

#[derive(Clone, Debug, clap::Args, Deserialize, Serialize)]
pub struct RunCmd {
    #[clap(flatten)]
    pub lens_params: LensParams,

    #[clap(flatten)]
    pub queue_params: QueueParams,

    #[clap(flatten)]
    pub reconcile_params: ReconcileParams,

    /// Load the configuration from a toml, json or yaml file. Values found in the file override
    /// the command line.
    #[arg(env = "LENSQ_CONFIG_FILE", long, value_name = "PATH")]
    pub config_file: Option<PathBuf>,
}

impl RunCmd {
    /// Merges the config file, if any, over the command line arguments.
    pub fn load(self) -> anyhow::Result<Self> {
        let mut config = Figment::new().merge(Serialized::defaults(&self));

        if let Some(config_path) = &self.config_file {
            config = match config_path.extension().and_then(|ext| ext.to_str()) {
                Some("toml") => config.merge(Toml::file(config_path)),
                Some("json") => config.merge(Json::file(config_path)),
                Some("yaml") | Some("yml") => config.merge(Yaml::file(config_path)),
                _ => bail!("Unsupported file type for config file."),
            };
        }

        let run_cmd: RunCmd = config.extract()?;
        run_cmd.reconcile_params.check()?;
        Ok(run_cmd)
    }
}

#[derive(Clone, Debug, clap::Args)]
pub struct EnqueueCmd {
    #[clap(flatten)]
    pub queue_params: QueueParams,

    /// Hash of the broadcast transaction.
    #[arg(long, value_name = "HASH", required_unless_present = "tx_id")]
    pub tx_hash: Option<String>,

    /// Relayer id of the transaction, when the hash is not known yet.
    #[arg(long, value_name = "ID")]
    pub tx_id: Option<String>,

    /// Body of the post.
    #[arg(long)]
    pub content: String,

    /// Media attached to the post, as `<mime type>=<uri>`. Can be repeated.
    #[arg(long, value_name = "TYPE=URI", value_parser = parse_attachment)]
    pub attachment: Vec<Attachment>,
}

#[derive(Clone, Debug, clap::Args)]
pub struct ListCmd {
    #[clap(flatten)]
    pub queue_params: QueueParams,

    /// Profile shown as the author of the pending posts.
    #[arg(env = "LENSQ_PROFILE_ID", long, value_name = "PROFILE ID")]
    pub profile_id: Option<String>,
}

pub fn parse_url(s: &str) -> Result<Url, url::ParseError> {
    s.parse()
}

pub fn parse_attachment(s: &str) -> anyhow::Result<Attachment> {
    let Some((mime_type, item)) = s.split_once('=') else {
        bail!("Expected `<mime type>=<uri>`, got `{s}`");
    };
    if mime_type.is_empty() || item.is_empty() {
        bail!("Expected `<mime type>=<uri>`, got `{s}`");
    }
    Ok(Attachment::new(item, mime_type))
}

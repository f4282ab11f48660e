use std::path::PathBuf;
use std::str::FromStr;

use bandcamp_core::{
    IdType, SubmitStrategy, DEFAULT_CREDENTIALS_PATH, DEFAULT_ORIGIN, DEFAULT_WARMUP,
};
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "bandcamp")]
#[command(about = "Query merch orders and update shipping status on Bandcamp")]
#[command(version)]
pub struct Args {
    /// Provider origin
    #[arg(long, env = "BANDCAMP_ORIGIN", default_value = DEFAULT_ORIGIN, global = true)]
    pub origin: String,

    /// Where the token pair is stored between runs
    #[arg(long, env = "BANDCAMP_CREDENTIALS", default_value = DEFAULT_CREDENTIALS_PATH, global = true)]
    pub credentials: PathBuf,

    /// HTTP timeout in seconds
    #[arg(long, default_value_t = 30, global = true)]
    pub timeout: u64,

    /// Retries for transient network failures
    #[arg(long, default_value_t = 2, global = true)]
    pub retries: u32,

    /// Enable debug logging
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Log in to bandcamp, or refresh the stored session
    Login {
        /// Client ID provided by bandcamp
        #[arg(short = 'i', long, alias = "client_id", env = "BANDCAMP_CLIENT_ID")]
        client_id: u64,

        /// Client secret provided by bandcamp
        #[arg(
            short = 's',
            long,
            alias = "client_secret",
            env = "BANDCAMP_CLIENT_SECRET",
            hide_env_values = true
        )]
        client_secret: String,
    },

    /// Get your band(s) info
    Bands,

    /// Get current orders
    Orders {
        /// Bandcamp ID of your label or band
        #[arg(short = 'b', long, alias = "band_id")]
        band_id: u64,

        /// Bandcamp ID of a band to filter on
        #[arg(short = 'm', long, alias = "member_band_id")]
        member_band_id: Option<u64>,

        /// Earliest sale date
        #[arg(short = 's', long, alias = "start_time")]
        start_time: Option<String>,

        /// Latest sale date
        #[arg(short = 'e', long, alias = "end_time")]
        end_time: Option<String>,

        /// Only items with this name
        #[arg(short = 'n', long)]
        name: Option<String>,

        /// Only orders not yet marked shipped
        #[arg(long, alias = "unshipped_only")]
        unshipped_only: bool,

        /// Only orders from this shipping origin
        #[arg(short = 'o', long, alias = "origin_id")]
        origin_id: Option<u64>,

        /// Display only these fields
        #[arg(short = 'f', long = "field")]
        fields: Vec<String>,
    },

    /// List merchandise available for purchase
    Merch {
        #[arg(short = 'b', long, alias = "band_id")]
        band_id: u64,

        #[arg(short = 'm', long, alias = "member_band_id")]
        member_band_id: Option<u64>,

        /// Earliest date items were added to Bandcamp
        #[arg(short = 's', long, alias = "start_time")]
        start_time: String,

        /// Latest date items were added; defaults to now
        #[arg(short = 'e', long, alias = "end_time")]
        end_time: Option<String>,

        /// Only these package ids
        #[arg(short = 'p', long = "package-id", alias = "package_ids")]
        package_ids: Vec<u64>,

        /// Display only these fields
        #[arg(short = 'f', long = "field")]
        fields: Vec<String>,
    },

    /// List shipping origins
    Shipping {
        #[arg(short = 'b', long, alias = "band_id")]
        band_id: Option<u64>,

        /// A specific shipping origin
        #[arg(short = 'o', long, alias = "origin_id")]
        origin_id: Option<u64>,
    },

    /// Update shipping information on orders (dry run unless --commit)
    Ship(ShipArgs),
}

#[derive(clap::Args, Debug)]
pub struct ShipArgs {
    /// Ids to update; takes precedence over --ids-file and the order query
    pub ids: Vec<u64>,

    /// Read ids from this file (JSON array or whitespace separated)
    #[arg(short = 'f', long, alias = "ids_file")]
    pub ids_file: Option<PathBuf>,

    /// Band to query orders for when no ids are given
    #[arg(short = 'b', long, alias = "band_id")]
    pub band_id: Option<u64>,

    /// Only orders purchased from this date
    #[arg(short = 's', long, alias = "start_time")]
    pub start_time: Option<String>,

    /// Only orders purchased up to this date
    #[arg(short = 'e', long, alias = "end_time")]
    pub end_time: Option<String>,

    /// Only items with this name
    #[arg(short = 'n', long)]
    pub name: Option<String>,

    /// Whether ids are payment ids (p) or sale item ids (s)
    #[arg(short = 't', long, alias = "id_type", default_value = "p", value_parser = IdType::from_str)]
    pub id_type: IdType,

    /// Mark the items as shipped (or not, with =false)
    #[arg(
        short = 'S',
        long,
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true"
    )]
    pub shipped: Option<bool>,

    /// Notify customers via email
    #[arg(
        short = 'N',
        long,
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true"
    )]
    pub notify: Option<bool>,

    /// Custom text for the notification email
    #[arg(short = 'M', long, alias = "notify_message")]
    pub notify_message: Option<String>,

    /// The date it was shipped
    #[arg(short = 'd', long, alias = "ship_date")]
    pub ship_date: Option<String>,

    /// The shipping carrier
    #[arg(short = 'c', long)]
    pub carrier: Option<String>,

    /// Carrier tracking code
    #[arg(short = 'T', long, alias = "tracking_code")]
    pub tracking_code: Option<String>,

    /// Send the updates to bandcamp; without it nothing is sent
    #[arg(short = 'C', long)]
    pub commit: bool,

    /// batched: one call for all ids; sequential: one call per id
    #[arg(long, default_value = "batched", value_parser = SubmitStrategy::from_str)]
    pub strategy: SubmitStrategy,

    /// Minimum delay between sequential calls, in milliseconds
    #[arg(long, default_value_t = 0)]
    pub interval: u64,

    /// Grace period before the first call, in seconds
    #[arg(long, default_value_t = DEFAULT_WARMUP.as_secs())]
    pub warmup: u64,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

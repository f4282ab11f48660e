//! Subcommand dispatch.
//!
//! Each command builds what it needs from `AppConfig`, runs it through the
//! core, and writes its result to `out`. Errors propagate to `main` with a
//! short context line. `run` returns the process exit status: a committed
//! ship with failed items is not an error but yields `EXIT_PARTIAL_FAILURE`,
//! kept apart from the status clap uses for usage errors (2).

use std::io::Write;
use std::time::Duration;

use anyhow::Context;
use bandcamp_core::{
    Api, BandcampClient, BatchEngine, ClientCredentials, FileCredentialStore, IdSource,
    MerchQuery, OrdersQuery, ShipOutcome, ShipSettings, ShipmentOptions, ShippingOriginsQuery,
    TokenManager,
};
use tracing::info;

use crate::cli::{Commands, ShipArgs};
use crate::config::AppConfig;
use crate::executor::UreqExecutor;
use crate::output;
use crate::progress::with_spinner;

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_PARTIAL_FAILURE: u8 = 3;

struct Session {
    client: BandcampClient,
    store: FileCredentialStore,
    executor: UreqExecutor,
    config: AppConfig,
}

impl Session {
    fn new(config: AppConfig) -> Self {
        Self {
            client: BandcampClient::new(&config.origin),
            store: FileCredentialStore::new(&config.credentials_path),
            executor: UreqExecutor::new(config.timeout),
            config,
        }
    }

    fn api(&self) -> Api<&FileCredentialStore, &UreqExecutor> {
        Api::new(self.client.clone(), &self.store, &self.executor)
            .with_retry_config(self.config.retry.clone())
    }
}

pub fn run(config: AppConfig, command: Commands, out: &mut dyn Write) -> anyhow::Result<u8> {
    let ctx = Session::new(config);
    let quiet = ctx.config.quiet;
    match command {
        Commands::Login {
            client_id,
            client_secret,
        } => {
            let tokens = TokenManager::new(ctx.client.clone(), &ctx.store, &ctx.executor);
            let credentials = ClientCredentials {
                client_id,
                client_secret,
            };
            with_spinner("Logging in", quiet, || tokens.login(&credentials))
                .context("login failed")?;
            info!(path = %ctx.store.path().display(), "logged in");
            writeln!(out, "Success")?;
        }

        Commands::Bands => {
            let bands = with_spinner("Fetching bands", quiet, || ctx.api().my_bands())
                .context("fetching bands")?;
            writeln!(out, "{}", output::bands_table(&bands))?;
        }

        Commands::Orders {
            band_id,
            member_band_id,
            start_time,
            end_time,
            name,
            unshipped_only,
            origin_id,
            fields,
        } => {
            let query = OrdersQuery {
                band_id,
                member_band_id,
                start_time,
                end_time,
                name,
                unshipped_only: unshipped_only.then_some(true),
                origin_id,
            };
            let orders = with_spinner("Fetching orders", quiet, || ctx.api().orders(&query))
                .context("fetching orders")?;
            output::write_json(out, &output::project(output::to_values(&orders)?, &fields))?;
        }

        Commands::Merch {
            band_id,
            member_band_id,
            start_time,
            end_time,
            package_ids,
            fields,
        } => {
            let query = MerchQuery {
                band_id,
                member_band_id,
                start_time,
                end_time,
                package_ids,
            };
            let merch = with_spinner("Fetching merch", quiet, || ctx.api().merch(&query))
                .context("fetching merch")?;
            output::write_json(out, &output::project(output::to_values(&merch)?, &fields))?;
        }

        Commands::Shipping { band_id, origin_id } => {
            let query = ShippingOriginsQuery { band_id, origin_id };
            let origins = with_spinner("Fetching shipping origins", quiet, || {
                ctx.api().shipping_origins(&query)
            })
            .context("fetching shipping origins")?;
            output::write_json(out, &serde_json::Value::Array(output::to_values(&origins)?))?;
        }

        Commands::Ship(args) => return ship(&ctx, args, out),
    }
    Ok(EXIT_SUCCESS)
}

fn ship(ctx: &Session, args: ShipArgs, out: &mut dyn Write) -> anyhow::Result<u8> {
    let query = args.band_id.map(|band_id| OrdersQuery {
        band_id,
        start_time: args.start_time.clone(),
        end_time: args.end_time.clone(),
        name: args.name.clone(),
        ..Default::default()
    });
    let source = IdSource::select(args.ids, args.ids_file, query)?;
    let options = ShipmentOptions {
        id_type: args.id_type,
        shipped: args.shipped,
        notify: args.notify,
        notify_message: args.notify_message,
        ship_date: args.ship_date,
        carrier: args.carrier,
        tracking_code: args.tracking_code,
    };
    let settings = ShipSettings {
        commit: args.commit,
        strategy: args.strategy,
        interval: Duration::from_millis(args.interval),
        warmup: Duration::from_secs(args.warmup),
    };

    let api = ctx.api();
    let engine = BatchEngine::new(&api);
    let quiet = ctx.config.quiet;
    let from_query = matches!(source, IdSource::Query(_));
    let plan = with_spinner("Fetching orders", quiet || !from_query, || {
        engine.plan(&source, options, settings)
    })
    .context("resolving ids")?;

    let outcome = if plan.settings.commit {
        let message = format!("Shipping {} ids to bandcamp", plan.ids.len());
        with_spinner(message, quiet, || engine.run(&plan))
    } else {
        engine.run(&plan)
    };

    match outcome {
        ShipOutcome::DryRun(report) => {
            if args.json {
                output::write_report_json(out, &report)?;
            } else {
                output::write_dry_run(out, &report)?;
            }
            Ok(EXIT_SUCCESS)
        }
        ShipOutcome::Committed(report) => {
            if args.json {
                output::write_report_json(out, &report)?;
            } else {
                output::write_batch_report(out, &report)?;
            }
            if report.is_complete_success() {
                Ok(EXIT_SUCCESS)
            } else {
                Ok(EXIT_PARTIAL_FAILURE)
            }
        }
    }
}

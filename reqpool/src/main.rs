use reqpool_cli::{DispatchArgs, PollArgs, RuntimeBehavior, UploadArgs};
use reqpool_config::Config;
use reqpool_core::{
    Dispatcher, PollConfig, Poller, ReqwestTransport, UploadFile, UploadRules, Uploader,
};

fn setup_tracing(
    config: &Config,
) -> anyhow::Result<tracing_appender::non_blocking::WorkerGuard> {
    let logfile = reqpool_config::LOGFILE;
    let data_dir = reqpool_loader::get_or_create_data_dir()?;
    let appender = tracing_appender::rolling::never(data_dir, logfile);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let level = config
        .log_level
        .parse::<tracing::Level>()
        .unwrap_or(tracing::Level::INFO);
    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(writer)
        .with_ansi(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    Ok(guard)
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn poll(args: PollArgs, config: &Config) -> anyhow::Result<()> {
    let interval = args
        .interval_ms
        .map(std::time::Duration::from_millis)
        .unwrap_or_else(|| config.poll_interval());
    let max_attempts = args.max_attempts.or(config.max_attempts).unwrap_or_default();
    let poll_config = PollConfig::default()
        .with_interval(interval)
        .with_max_attempts(max_attempts)
        .with_transport(config.transport_config());

    let poller = Poller::new(ReqwestTransport::new());
    let mut handle = poller
        .poll::<serde_json::Value>(&args.target, poll_config)
        .await?;
    print_json(handle.first())?;

    if args.wait {
        while let Some(envelope) = handle.changed().await {
            print_json(&envelope)?;
        }
    }

    Ok(())
}

async fn dispatch(args: DispatchArgs, config: &Config) -> anyhow::Result<()> {
    let base = args
        .base
        .or_else(|| config.base_target.clone())
        .ok_or_else(|| anyhow::anyhow!("no base target given, pass --base or set `base_target`"))?;
    let descriptors = reqpool_loader::batch_loader::read_batch_file(&args.batch_file)?;

    let dispatcher = Dispatcher::new(&base, config.transport_config(), ReqwestTransport::new())?;
    let results = dispatcher.dispatch_all(descriptors).await?;
    print_json(&results)
}

async fn upload(args: UploadArgs, config: &Config) -> anyhow::Result<()> {
    let file = UploadFile::from_path(&args.file, args.content_type).await?;
    let rules = UploadRules {
        allowed: args.allowed,
        not_allowed: args.not_allowed,
        max_size_mb: args.max_size_mb,
        min_size_mb: args.min_size_mb,
    };

    let uploader = Uploader::new(&args.url, config.transport_config(), ReqwestTransport::new())?;
    let response = uploader.send_file(&file, &rules).await?;
    println!("uploaded {} ({} bytes): {}", file.file_name, file.size(), response.status);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let runtime_behavior = reqpool_cli::Cli::parse_args();
    let loaded = reqpool_config::try_load_config();
    let config = match loaded {
        Ok(ref config) => config.clone(),
        Err(ref e) => {
            eprintln!("warning: {e:#}, using the default configuration");
            reqpool_config::load_default_config()
        }
    };

    match runtime_behavior {
        RuntimeBehavior::PrintConfigPath => {
            reqpool_cli::Cli::print_config_path(
                reqpool_config::get_config_dir_path(),
                reqpool_config::get_usual_path(),
            );
            return Ok(());
        }
        RuntimeBehavior::PrintDataPath => {
            reqpool_cli::Cli::print_data_path(reqpool_loader::data_dir());
            return Ok(());
        }
        RuntimeBehavior::DumpDefaultConfig => {
            reqpool_cli::Cli::print_default_config(reqpool_config::default_as_str());
            return Ok(());
        }
        RuntimeBehavior::Help => {
            reqpool_cli::Cli::print_help();
            return Ok(());
        }
        _ => {}
    }

    let guard = setup_tracing(&config)?;
    if let Err(e) = loaded {
        tracing::warn!("falling back to default config: {e:#}");
    }

    let result = match runtime_behavior {
        RuntimeBehavior::Poll(args) => poll(args, &config).await,
        RuntimeBehavior::Dispatch(args) => dispatch(args, &config).await,
        RuntimeBehavior::Upload(args) => upload(args, &config).await,
        _ => Ok(()),
    };

    if let Err(ref e) = result {
        tracing::error!("{e:?}");
    }

    _ = guard;
    result
}

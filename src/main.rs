use std::{path::Path, process};

use manimark::{
    application::{
        error::{AppError, error_chain},
        render::{
            DocumentOptions, HtmlSurface, ManimRenderer, RendererOptions, figure_html,
            render_document,
        },
    },
    config::{self, BlockArgs, Command, DocumentArgs, Settings},
    infra::telemetry,
};
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    let chain = error_chain(error);
    if dispatcher::has_been_set() {
        error!(error = %error, chain = ?chain, "application error");
        return;
    }

    let subscriber = tracing_fmt()
        .with_writer(std::io::stderr)
        .with_max_level(Level::ERROR)
        .finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, chain = ?chain, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()?;

    telemetry::init(&settings.logging)?;
    let renderer = ManimRenderer::new(RendererOptions::from(&settings.renderer))?;
    info!(
        target = "manimark::main",
        endpoint = %renderer.endpoint(),
        fence_language = %settings.renderer.fence_language,
        "Render server configured"
    );

    match cli_args.command {
        Command::Document(args) => run_document(&settings, &renderer, args).await,
        Command::Block(args) => run_block(&settings, &renderer, args).await,
    }
}

async fn run_document(
    settings: &Settings,
    renderer: &ManimRenderer,
    args: DocumentArgs,
) -> Result<(), AppError> {
    let markdown = tokio::fs::read_to_string(&args.input)
        .await
        .map_err(|source| AppError::input(&args.input, source))?;

    let document = render_document(&markdown, renderer, &DocumentOptions::from(settings)).await?;
    write_output(args.output.as_deref(), &document.html).await
}

async fn run_block(
    settings: &Settings,
    renderer: &ManimRenderer,
    args: BlockArgs,
) -> Result<(), AppError> {
    let code = tokio::fs::read_to_string(&args.source)
        .await
        .map_err(|source| AppError::input(&args.source, source))?;

    let mut surface = HtmlSurface::new(DocumentOptions::from(settings).media);
    renderer.render(&code, &args.info, &mut surface).await;

    write_output(args.output.as_deref(), &figure_html(&surface)).await
}

async fn write_output(path: Option<&Path>, html: &str) -> Result<(), AppError> {
    match path {
        Some(path) => tokio::fs::write(path, html)
            .await
            .map_err(|source| AppError::output(path, source)),
        None => {
            print!("{html}");
            Ok(())
        }
    }
}

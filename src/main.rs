use chrono::{DateTime, FixedOffset, Utc};
use clap::{Parser, Subcommand};
use postsmith::config::{self, PostsmithConfig};
use postsmith::layout::PostLayout;
use postsmith::vcs::{Author, GitRepository};
use postsmith::{Post, PostId, PostService, logging, output};
use serde::Serialize;
use std::io::Read;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "postsmith")]
#[command(about = "Publish channel messages as Zola posts in a git repository")]
#[command(long_about = "\
Publish channel messages as Zola posts in a git repository

Posts live under the site's posts directory, named after the message id:

  content/posts/
  ├── 4211.md                  # post without media
  └── 4215/                    # post with media
      ├── index.md
      ├── image_0.jpg
      └── image_1.png

create and edit stage their files; delete and publish commit and push.
Edits snap to the nearest post id, so an edit of the third message of a
media group lands in that group's post as image_2.

Run 'postsmith gen-config' to generate a documented postsmith.toml.")]
#[command(version)]
struct Cli {
    /// Config file
    #[arg(long, default_value = config::DEFAULT_CONFIG_FILE, global = true)]
    config: PathBuf,

    /// Site working tree (overrides repository.path)
    #[arg(long, global = true)]
    repo: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Errors only
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Access token used to fetch and push over HTTPS
    #[arg(long, env = "POSTSMITH_GIT_TOKEN", hide_env_values = true, global = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write a new post and stage it
    Create(CreateArgs),
    /// Amend the post nearest to a message id and stage the change
    Edit(EditArgs),
    /// Delete comma-separated post ids, then commit and push
    Delete {
        /// e.g. "600,601,602"
        ids: String,
    },
    /// Commit everything staged and push it
    Publish {
        #[arg(short, long)]
        message: String,
        /// Stage every change under the posts directory first
        #[arg(long)]
        all: bool,
    },
    /// Clone the site when missing, otherwise fast-forward it
    Sync,
    /// Print the markdown a message renders to
    Render {
        /// Message file, or - for stdin
        file: Option<PathBuf>,
    },
    /// Print a stock postsmith.toml with all options documented
    GenConfig,
}

#[derive(clap::Args)]
struct CreateArgs {
    /// Message id
    #[arg(long)]
    id: PostId,

    /// Title; derived from the channel and a trailing address when omitted
    #[arg(long, default_value = "")]
    title: String,

    /// RFC 3339 timestamp; defaults to now
    #[arg(long, value_parser = parse_date)]
    date: Option<DateTime<FixedOffset>>,

    /// Message file, or - for stdin
    #[arg(long)]
    content: Option<PathBuf>,

    /// Media file, in order; repeat for a media group
    #[arg(long)]
    media: Vec<PathBuf>,
}

#[derive(clap::Args)]
struct EditArgs {
    /// Id of the edited message
    #[arg(long)]
    id: PostId,

    /// New message text, or - for stdin; the markup is kept when omitted
    #[arg(long)]
    content: Option<PathBuf>,

    /// Replacement media for this message's slot
    #[arg(long)]
    media: Option<PathBuf>,

    /// Name whose extension every existing media entry should be listed with
    #[arg(long)]
    image_hint: Option<String>,

    /// RFC 3339 timestamp; defaults to now
    #[arg(long, value_parser = parse_date)]
    date: Option<DateTime<FixedOffset>>,
}

fn parse_date(s: &str) -> Result<DateTime<FixedOffset>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(s)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose, cli.quiet);

    match &cli.command {
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
        Command::Render { file } => {
            let content = read_content(Some(file.as_deref().unwrap_or(Path::new("-"))))?;
            println!("{}", postsmith::transform(&content));
        }
        Command::Create(args) => {
            let config = config::load_config(&cli.config)?;
            let service = post_service(&cli, &config);
            let content = read_content(args.content.as_deref())?;
            let post =
                Post::new(args.id, content, date_or_now(args.date)).with_title(args.title.clone());
            let media = args
                .media
                .iter()
                .map(std::fs::read)
                .collect::<Result<Vec<_>, _>>()?;
            let change = service.create(post, &media)?;
            report(cli.json, &change, output::format_post_change)?;
        }
        Command::Edit(args) => {
            let config = config::load_config(&cli.config)?;
            let service = post_service(&cli, &config);
            let content = read_content(args.content.as_deref())?;
            let mut post = Post::new(args.id, content, date_or_now(args.date));
            if let Some(hint) = &args.image_hint {
                post = post.with_image_names(vec![hint.clone()]);
            }
            let media = args.media.as_ref().map(std::fs::read).transpose()?;
            let change = service.edit(post, media.as_deref())?;
            report(cli.json, &change, output::format_post_change)?;
        }
        Command::Delete { ids } => {
            let config = config::load_config(&cli.config)?;
            let deletion = post_service(&cli, &config).delete(ids)?;
            report(cli.json, &deletion, output::format_deletion)?;
        }
        Command::Publish { message, all } => {
            let config = config::load_config(&cli.config)?;
            if *all {
                git_repository(&cli, &config)
                    .stage_all(Path::new(&config.repository.posts_dir))?;
            }
            post_service(&cli, &config).publish(message)?;
            if cli.json {
                output::print_json(&serde_json::json!({ "published": message }))?;
            } else {
                output::print_lines(&output::format_published(message));
            }
        }
        Command::Sync => {
            let config = config::load_config(&cli.config)?;
            let outcome =
                git_repository(&cli, &config).sync(config.repository.url.as_deref())?;
            report(cli.json, &outcome, output::format_sync)?;
        }
    }

    Ok(())
}

fn repo_dir(cli: &Cli, config: &PostsmithConfig) -> PathBuf {
    cli.repo
        .clone()
        .unwrap_or_else(|| config.repository.path.clone())
}

fn git_repository(cli: &Cli, config: &PostsmithConfig) -> GitRepository {
    let author = Author {
        name: config.author.name.clone(),
        email: config.author.email.clone(),
    };
    GitRepository::new(
        repo_dir(cli, config),
        config.repository.remote.clone(),
        config.repository.branch.clone(),
        author,
    )
    .with_token(cli.token.clone())
}

fn post_service(cli: &Cli, config: &PostsmithConfig) -> PostService<GitRepository> {
    let layout = PostLayout::in_repository(
        &repo_dir(cli, config),
        Path::new(&config.repository.posts_dir),
    );
    PostService::new(layout, git_repository(cli, config), config.channel.clone())
}

/// `None` → empty, `-` → stdin, anything else → file contents.
fn read_content(source: Option<&Path>) -> std::io::Result<String> {
    match source {
        None => Ok(String::new()),
        Some(path) if path == Path::new("-") => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
        Some(path) => std::fs::read_to_string(path),
    }
}

fn date_or_now(date: Option<DateTime<FixedOffset>>) -> DateTime<FixedOffset> {
    date.unwrap_or_else(|| Utc::now().fixed_offset())
}

fn report<T: Serialize>(
    json: bool,
    value: &T,
    format: fn(&T) -> Vec<String>,
) -> Result<(), serde_json::Error> {
    if json {
        output::print_json(value)
    } else {
        output::print_lines(&format(value));
        Ok(())
    }
}

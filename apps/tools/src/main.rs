use anyhow::Result;
use clap::{Parser, Subcommand};
use client_core::config::normalize_database_url;
use shared::domain::{parse_tags, Post, PostId};
use storage::Storage;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
struct Cli {
    #[arg(long, default_value = "sqlite://blog.db")]
    database_url: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the database file and schema if missing.
    Init,
    List {
        /// Only posts attributed to this username.
        #[arg(long)]
        author: Option<String>,
    },
    Show {
        post_id: i64,
    },
    Create {
        #[arg(long)]
        title: String,
        #[arg(long)]
        content: String,
        /// Comma separated.
        #[arg(long, default_value = "")]
        tags: String,
        #[arg(long)]
        author: Option<String>,
    },
    Update {
        post_id: i64,
        #[arg(long)]
        title: String,
        #[arg(long)]
        content: String,
    },
    Delete {
        post_id: i64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let storage = Storage::new(&normalize_database_url(&cli.database_url)).await?;

    match cli.command {
        Command::Init => {
            storage.health_check().await?;
            println!("database ready posts={}", storage.post_count().await?);
        }
        Command::List { author } => {
            let posts = match author {
                Some(username) => match storage.find_user(&username).await? {
                    Some(user_id) => storage.list_posts_by_author(user_id).await?,
                    None => Vec::new(),
                },
                None => storage.list_posts().await?,
            };
            for post in &posts {
                print_summary(post);
            }
        }
        Command::Show { post_id } => {
            let post = storage.get_post(PostId(post_id)).await?;
            print_summary(&post);
            println!();
            println!("{}", post.content);
        }
        Command::Create {
            title,
            content,
            tags,
            author,
        } => {
            let author_id = match author {
                Some(username) => Some(storage.create_user(&username).await?),
                None => None,
            };
            let post = storage
                .create_post(&title, &content, &parse_tags(&tags), author_id)
                .await?;
            println!("created post_id={}", post.id);
        }
        Command::Update {
            post_id,
            title,
            content,
        } => {
            let post = storage
                .update_post(PostId(post_id), &title, &content)
                .await?;
            println!("updated post_id={}", post.id);
        }
        Command::Delete { post_id } => {
            storage.delete_post(PostId(post_id)).await?;
            println!("deleted post_id={post_id}");
        }
    }

    Ok(())
}

fn print_summary(post: &Post) {
    let created = post.created_at.format("%Y-%m-%d %H:%M");
    let author = post.author_name().unwrap_or("anonymous");
    if post.tags.is_empty() {
        println!("{}\t{created}\t{author}\t{}", post.id, post.title);
    } else {
        println!(
            "{}\t{created}\t{author}\t{} [{}]",
            post.id,
            post.title,
            post.tags.join(", ")
        );
    }
}

//! 宠物社交 CLI 客户端（测试版）
//!
//! - `demo`：在内存后端上跑一遍完整的关系、评论与转移流程，只展示回调与日志
//! - `profile` / `thread`：通过 HTTP API 查看资料与评论树

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use petsocial_sdk_core::social::post::{CommentSort, PostListener, Visibility};
use petsocial_sdk_core::social::privacy::ProfileDetails;
use petsocial_sdk_core::social::relation::{PrivacyLevel, RelationListener, RequestDirection};
use petsocial_sdk_core::social::transfer::{Species, TransferType};
use petsocial_sdk_core::{
    ClientConfig, Credentials, MemoryBackend, SocialClient, SocialError, UserId,
};
use std::sync::Arc;
use tracing::{error, info, warn};

/// 宠物社交 CLI 客户端
#[derive(Parser, Debug)]
#[command(name = "petsocial-cli")]
#[command(about = "宠物社交 CLI 客户端 - 用于测试和展示社交互动功能", long_about = None)]
struct Args {
    /// HTTP API 基础地址
    #[arg(long, default_value = "http://localhost:8000/api/v1")]
    api_base_url: String,

    /// 访问令牌（由认证服务签发）
    #[arg(long, default_value = "")]
    token: String,

    /// 当前登录用户 ID
    #[arg(long, default_value = "1")]
    viewer: UserId,

    /// 日志级别（默认: info,petsocial_sdk_core=debug）
    #[arg(long, default_value = "info,petsocial_sdk_core=debug")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 在内存后端上运行完整演示
    Demo,
    /// 查看用户资料
    Profile {
        user_id: UserId,
    },
    /// 查看帖子评论树
    Thread {
        post_id: i64,
        /// newest / oldest / most_likes / most_replies / recent_activity
        #[arg(long, default_value = "newest")]
        sort: CommentSort,
    },
}

/// 初始化日志（同时输出到 stdout 和文件）
fn init_logger(log_level: &str) -> Result<()> {
    use std::fs::OpenOptions;
    use std::io;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    // 优先使用环境变量 RUST_LOG，否则使用命令行参数
    let filter_layer =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open("debug.log")
        .context("无法创建日志文件 debug.log")?;

    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stdout)
        .with_file(true)
        .with_line_number(true)
        .with_target(false)
        .with_ansi(true);

    // 文件不需要颜色
    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(log_file)
        .with_file(true)
        .with_line_number(true)
        .with_target(false)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    info!("[CLI] 📝 日志已同时输出到控制台和文件: debug.log");
    Ok(())
}

/// 设置监听器（输出所有接收到的回调）
fn setup_listeners(client: &mut SocialClient, who: &'static str) {
    struct CliRelationListener(&'static str);
    #[async_trait::async_trait]
    impl RelationListener for CliRelationListener {
        async fn on_relationship_changed(&self, user_id: UserId, relationship_json: String) {
            info!(
                "[CLI/{}/Relation] 🔄 与 {} 的关系: {}",
                self.0, user_id, relationship_json
            );
        }

        async fn on_friend_list_changed(&self, friends_json: String) {
            info!("[CLI/{}/Relation] 👥 好友列表变更: {}", self.0, friends_json);
        }

        async fn on_black_list_changed(&self, blacks_json: String) {
            info!("[CLI/{}/Relation] 🚫 黑名单变更: {}", self.0, blacks_json);
        }

        async fn on_friend_request_list_changed(&self, requests_json: String) {
            info!("[CLI/{}/Relation] 📝 好友申请变更: {}", self.0, requests_json);
        }

        async fn on_lists_invalidated(&self, lists_json: String) {
            info!("[CLI/{}/Relation] ♻️ 列表失效: {}", self.0, lists_json);
        }
    }
    client.set_relation_listener(Arc::new(CliRelationListener(who)));

    struct CliPostListener(&'static str);
    #[async_trait::async_trait]
    impl PostListener for CliPostListener {
        async fn on_post_changed(&self, post_json: String) {
            info!("[CLI/{}/Post] 📰 帖子变更: {}", self.0, post_json);
        }

        async fn on_comments_changed(&self, post_id: i64, comments_json: String) {
            info!(
                "[CLI/{}/Post] 💬 帖子 {} 评论树变更，{} 字节",
                self.0,
                post_id,
                comments_json.len()
            );
        }
    }
    client.set_post_listener(Arc::new(CliPostListener(who)));
}

fn print_thread(client: &SocialClient, post_id: i64) {
    let Some(thread) = client.comments().thread(post_id) else {
        warn!("[CLI] 帖子 {} 的评论树尚未加载", post_id);
        return;
    };
    info!(
        "[CLI] 🌳 帖子 {} 评论树（{}），共 {} 条",
        post_id,
        thread.sort().as_str(),
        thread.len()
    );
    for (depth, c) in thread.flatten() {
        info!(
            "[CLI] {}#{} {}: {} (👍 {})",
            "  ".repeat(depth),
            c.id,
            c.author.name(),
            c.content,
            c.like_count
        );
    }
}

async fn run_demo() -> Result<()> {
    info!("[CLI] 🚀 内存后端演示");
    let backend = MemoryBackend::new();
    let alice = backend.add_user("alice", PrivacyLevel::Public);
    let bob = backend.add_user("bob", PrivacyLevel::Private);
    let carol = backend.add_user("carol", PrivacyLevel::Public);

    let mut a = SocialClient::in_memory(backend.session(alice));
    let mut b = SocialClient::in_memory(backend.session(bob));
    let mut c = SocialClient::in_memory(backend.session(carol));
    setup_listeners(&mut a, "alice");
    setup_listeners(&mut b, "bob");
    setup_listeners(&mut c, "carol");
    a.sign_in(alice).await?;
    b.sign_in(bob).await?;
    c.sign_in(carol).await?;

    // 私密账号：成为好友前只能看到锁定视图
    let view = a.relations().view_profile(bob).await?;
    info!("[CLI] 🔒 alice 查看 bob 的资料，完整: {}", view.is_full());

    a.relations()
        .send_friend_request(bob, Some("一起遛狗吗？"))
        .await?;
    let received = b
        .relations()
        .load_friend_requests(RequestDirection::Received)
        .await?;
    for request in received {
        b.relations().accept_friend_request(request.id).await?;
    }
    let view = a.relations().view_profile(bob).await?;
    if let ProfileDetails::Full { bio, .. } = &view.details {
        info!("[CLI] 🔓 成为好友后可见简介: {:?}", bio);
    }

    // 帖子点赞与评论树
    let post_id = backend.add_post(bob, "今天的柯基", Visibility::Friends, true);
    a.posts().load_post(post_id).await?;
    let like = a.posts().toggle_like(post_id).await?;
    info!("[CLI] ❤️ alice 点赞，当前 {} 个赞", like.like_count);

    a.comments().load_thread(post_id, CommentSort::Newest).await?;
    let root = a
        .comments()
        .add_comment(post_id, "好可爱！", None, None)
        .await?;
    b.comments().load_thread(post_id, CommentSort::Oldest).await?;
    b.comments()
        .add_comment(post_id, "谢谢～", Some(root.id), None)
        .await?;
    b.comments().toggle_like(root.id).await?;
    a.comments().load_thread(post_id, CommentSort::Newest).await?;
    a.comments()
        .delete_comment(root.id, Some("发错了".to_string()))
        .await?;
    print_thread(&a, post_id);

    // 宠物转移
    let pet_id = backend.add_pet(alice, "豆豆", Species::Dog);
    let request = a
        .transfers()
        .request_transfer(pet_id, bob, TransferType::Gift, Some("搬家".to_string()), None)
        .await?;
    b.transfers().load_pending(RequestDirection::Received).await?;
    b.transfers().accept(request.id).await?;
    let history = b.transfers().load_history(pet_id).await?;
    info!("[CLI] 🐶 豆豆的转移历史: {} 条", history.len());

    // 拉黑后对被拉黑方不可见
    c.relations().block(alice, Some("骚扰")).await?;
    match a.relations().view_profile(carol).await {
        Err(SocialError::NotFound(_)) => info!("[CLI] 🚫 carol 的资料对 alice 不存在"),
        other => warn!("[CLI] 意外的结果: {:?}", other.map(|v| v.is_full())),
    }

    info!("[CLI] 📊 alice 的统计: {:?}", a.relations().stats().await?);
    a.sign_out().await?;
    b.sign_out().await?;
    c.sign_out().await?;
    info!("[CLI] ✅ 演示结束");
    Ok(())
}

async fn http_client(args: &Args) -> Result<SocialClient> {
    let mut config = ClientConfig::new(args.api_base_url.clone());
    config.cache_db_url = None;
    let credentials = Credentials {
        access_token: args.token.clone(),
        refresh_token: None,
    };
    let mut client = SocialClient::connect(config, &credentials)?;
    setup_listeners(&mut client, "http");
    client.sign_in(args.viewer).await?;
    Ok(client)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logger(&args.log_level)?;

    info!("[CLI] 🚀 宠物社交 CLI 客户端（测试模式）");
    let result = match &args.command {
        Command::Demo => run_demo().await,
        Command::Profile { user_id } => {
            let client = http_client(&args).await?;
            let view = client.relations().view_profile(*user_id).await?;
            info!(
                "[CLI] 👤 {}",
                serde_json::to_string_pretty(&view).context("序列化资料失败")?
            );
            Ok(())
        }
        Command::Thread { post_id, sort } => {
            let client = http_client(&args).await?;
            client.comments().load_thread(*post_id, *sort).await?;
            print_thread(&client, *post_id);
            Ok(())
        }
    };

    if let Err(e) = &result {
        error!("[CLI] ❌ 执行失败: {e:#}");
    }
    result
}

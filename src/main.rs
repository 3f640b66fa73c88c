//! chatform 聊天 REPL
//!
//! 逐行读入消息并打印引擎回复。表单以 HTML 片段原样输出。
//!
//! 命令：`/history` 查看会话历史，`/clear` 清除会话，`/quit` 退出。

use std::io::Write as _;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};

use chatform::build_engine;
use chatform::config::load_config;

#[tokio::main]
async fn main() -> Result<()> {
    chatform::observability::init();

    let config = load_config(None).unwrap_or_default();
    let engine = build_engine(&config);
    tracing::info!(variant = %config.classifier.variant, "chatform 启动");

    println!("chatform 已就绪。直接输入消息开始对话；/history 查看历史，/clear 清除会话，/quit 退出。");
    prompt()?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let input = line.trim();
        match input {
            "" => {}
            "/quit" | "/exit" => break,
            "/clear" => {
                engine.clear_session(None).await;
                println!("会话已清除。");
            }
            "/history" => {
                let history = engine.history(None).await;
                if history.is_empty() {
                    println!("（历史为空）");
                }
                for (i, turn) in history.iter().enumerate() {
                    let speaker = if i % 2 == 0 { "用户" } else { "系统" };
                    println!("[{speaker}] {turn}");
                }
            }
            message => {
                let reply = engine.handle_message(None, message).await;
                println!("{}", reply.response_text);
                if let Some(markup) = &reply.form_markup {
                    println!("{markup}");
                }
            }
        }
        prompt()?;
    }

    Ok(())
}

fn prompt() -> Result<()> {
    print!("> ");
    std::io::stdout().flush()?;
    Ok(())
}

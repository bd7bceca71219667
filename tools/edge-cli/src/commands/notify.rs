//! Push notification preview.

use std::sync::Arc;

use anyhow::Result;
use edge_worker::{ClientHub, MemorySurface, NotificationChannel};

use super::NotifyArgs;
use crate::context::Context;

/// Run the notify command.
pub async fn run(args: NotifyArgs, ctx: &Context) -> Result<()> {
    let config = ctx.require_config()?;
    let surface = Arc::new(MemorySurface::new());
    let clients = Arc::new(ClientHub::new());
    let channel = NotificationChannel::new(
        config.notification.clone(),
        config.root_url(),
        surface.clone(),
        clients,
    );

    let id = channel.on_push(args.payload.as_deref().map(str::as_bytes));
    let shown = surface.visible();

    if ctx.output.is_json() {
        let notifications: Vec<_> = shown.iter().map(|(_, n)| n).collect();
        ctx.output.json(&notifications);
    } else {
        for (_, n) in &shown {
            ctx.output.header(&n.title);
            ctx.output.kv("body", &n.body);
            ctx.output.kv("icon", &n.icon);
            ctx.output.kv("badge", &n.badge);
            let vibrate: Vec<String> = n.vibrate.iter().map(|ms| ms.to_string()).collect();
            ctx.output.kv("vibrate", &vibrate.join(", "));
            for action in &n.actions {
                ctx.output.list_item(&format!("[{}] {}", action.action, action.title));
            }
        }
    }

    if let Some(action) = args.click {
        let window = channel.on_click(id, Some(action.as_str()));
        ctx.output.success(&format!(
            "Clicked {:?}: {:?} {}; {} notification(s) left",
            action,
            window,
            config.root_url(),
            surface.visible().len()
        ));
    }

    Ok(())
}

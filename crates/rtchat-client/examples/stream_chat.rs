use std::io::Write as _;

use rtchat_client::prelude::*;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), ClientError> {
    rtchat_client::observability::init_observability();

    let config = ClientConfig::from_env()?;
    let model = ApiClient::new(&config)?.model_label().await;
    if !model.is_empty() {
        eprintln!("model: {model}");
    }

    let (mut transport, mut frames) = SseTransport::new(&config)?;
    let mut chat = ChatController::from_config(&config);
    chat.submit(&mut transport, "Show me the $BTC orderbook.", config.rt_mode)?;

    let mut shown = String::new();
    while let Some(SessionEvent { session, event }) = frames.recv().await {
        let outcome = chat.dispatch(session, &event);
        if let Some(turn) = chat.conversation().last()
            && turn.role == Role::Assistant
            && turn.text != shown
        {
            match turn.text.strip_prefix(shown.as_str()) {
                Some(rest) => print!("{rest}"),
                // a draft replaced the text
                None => print!("\n{}", turn.text),
            }
            let _ = std::io::stdout().flush();
            shown.clone_from(&turn.text);
        }
        if let Dispatch::Closed(_) = outcome {
            println!();
            break;
        }
    }

    if let Some(card) = chat.selected_card() {
        println!("\n{card}");
    }
    Ok(())
}

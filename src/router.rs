use std::sync::Arc;

use tracing::{debug, error, info};

use crate::capabilities::{Completion, CompletionRequest, ImageGenerator, ImageSize, PhoneValidator};
use crate::format::{phone_report, sign};
use crate::guard::{Authorized, Principal};
use crate::platform::{InboundEvent, OutboundResponse};

const START_TEXT: &str = "🤖 Bot attivo!\n\
    Comandi disponibili:\n\
    /chat testo → ChatGPT\n\
    /image testo → genera immagine\n\
    /sky testo → info programma Sky\n\
    /skytoday → panoramica cosa danno oggi su Sky\n\
    Messaggi privati triggerano automaticamente il check VOIP.\n\
    In qualsiasi chat puoi usare @NomeBot per risposte inline.";

const USAGE_CHAT: &str = "Scrivi qualcosa dopo /chat";
const USAGE_IMAGE: &str = "Scrivi qualcosa dopo /image";
const USAGE_SKY: &str = "Scrivi il nome del programma dopo /sky";

const PHONE_UNAVAILABLE: &str = "ℹ️ Numero non disponibile su Telegram.";
const PHONE_CHECK_FAILED: &str = "❌ Errore durante il controllo del numero.";
pub const REQUEST_FAILED: &str = "❌ Errore durante la richiesta.";

const ASSISTANT_PROMPT: &str = "Sei un assistente personale che risponde in italiano.";
const SKY_PROGRAM_PROMPT: &str = "Sei un assistente esperto di programmi Sky. \
    Spiega che programma è, che contenuto offre e su che tipo di canale va in onda.";
const SKY_TODAY_PROMPT: &str = "Sei una guida TV esperta di Sky Italia. \
    Descrivi cosa viene solitamente trasmesso oggi su Sky, dividendo per categorie: \
    Film, Serie TV, Sport, Intrattenimento. \
    Non fornire orari precisi, ma una panoramica realistica.";
const SKY_TODAY_QUESTION: &str = "Cosa danno oggi su Sky?";

const INLINE_TITLE: &str = "Risposta del bot";

/// Commands the router understands, with their menu descriptions
pub const COMMANDS: &[(&str, &str)] = &[
    ("start", "Mostra i comandi disponibili"),
    ("chat", "Chiedi qualcosa a ChatGPT"),
    ("image", "Genera un'immagine"),
    ("sky", "Info su un programma Sky"),
    ("skytoday", "Cosa danno oggi su Sky"),
];

/// Maps every inbound event to at most one reply.
///
/// Stateless: each call to [`Router::dispatch`] is independent, so one router
/// is shared across all concurrently handled updates.
pub struct Router {
    principal: Principal,
    completion: Arc<dyn Completion>,
    images: Arc<dyn ImageGenerator>,
    phones: Arc<dyn PhoneValidator>,
}

impl Router {
    pub fn new(
        principal: Principal,
        completion: Arc<dyn Completion>,
        images: Arc<dyn ImageGenerator>,
        phones: Arc<dyn PhoneValidator>,
    ) -> Self {
        Self {
            principal,
            completion,
            images,
            phones,
        }
    }

    pub fn authorize(&self, event: InboundEvent) -> Option<Authorized> {
        let sender_id = event.sender_id();
        let authorized = self.principal.authorize(event);
        if authorized.is_none() {
            debug!("Ignoring event from unauthorized user {}", sender_id);
        }
        authorized
    }

    /// Authorize, then handle. Unauthorized events produce nothing.
    pub async fn dispatch(&self, event: InboundEvent) -> Option<OutboundResponse> {
        let event = self.authorize(event)?;
        self.handle(event).await
    }

    pub async fn handle(&self, event: Authorized) -> Option<OutboundResponse> {
        match event.into_event() {
            InboundEvent::Command { name, args, .. } => {
                info!("Command /{} ({} args)", name, args.len());
                self.handle_command(&name, &args.join(" ")).await
            }
            InboundEvent::PlainMessage {
                text, sender_phone, ..
            } => {
                info!("Plain message ({} chars), running phone check", text.len());
                Some(self.auto_check(sender_phone.as_deref()).await)
            }
            InboundEvent::InlineQuery { query, .. } => {
                info!("Inline query: {}", query);
                self.inline_answer(&query).await
            }
        }
    }

    async fn handle_command(&self, name: &str, argument: &str) -> Option<OutboundResponse> {
        let argument = argument.trim();
        let reply = match name {
            "start" => OutboundResponse::plain(START_TEXT),
            "chat" => {
                if argument.is_empty() {
                    return Some(OutboundResponse::plain(USAGE_CHAT));
                }
                self.completion_reply(CompletionRequest::new(ASSISTANT_PROMPT, argument, 0.7))
                    .await
            }
            "image" => {
                if argument.is_empty() {
                    return Some(OutboundResponse::plain(USAGE_IMAGE));
                }
                self.image_reply(argument).await
            }
            "sky" => {
                if argument.is_empty() {
                    return Some(OutboundResponse::plain(USAGE_SKY));
                }
                self.completion_reply(CompletionRequest::new(SKY_PROGRAM_PROMPT, argument, 0.4))
                    .await
            }
            "skytoday" => {
                self.completion_reply(CompletionRequest::new(
                    SKY_TODAY_PROMPT,
                    SKY_TODAY_QUESTION,
                    0.3,
                ))
                .await
            }
            _ => {
                debug!("Unknown command /{}", name);
                return None;
            }
        };
        Some(reply)
    }

    async fn completion_reply(&self, request: CompletionRequest) -> OutboundResponse {
        match self.completion.complete(&request).await {
            Ok(text) => OutboundResponse::markdown(sign(&text)),
            Err(e) => {
                error!("Completion request failed: {:#}", e);
                OutboundResponse::markdown(sign(REQUEST_FAILED))
            }
        }
    }

    async fn image_reply(&self, prompt: &str) -> OutboundResponse {
        match self
            .images
            .generate_image(prompt, ImageSize::SQUARE_1024)
            .await
        {
            Ok(url) => OutboundResponse::Photo { url },
            Err(e) => {
                error!("Image generation failed: {:#}", e);
                OutboundResponse::markdown(sign(REQUEST_FAILED))
            }
        }
    }

    /// Validate the sender's own number. The message text is not used.
    async fn auto_check(&self, sender_phone: Option<&str>) -> OutboundResponse {
        let Some(phone) = sender_phone.filter(|p| !p.trim().is_empty()) else {
            return OutboundResponse::markdown(sign(PHONE_UNAVAILABLE));
        };

        match self.phones.validate_phone(phone).await {
            Ok(result) => OutboundResponse::markdown(phone_report(&result)),
            Err(e) => {
                error!("Phone check failed: {:#}", e);
                OutboundResponse::markdown(sign(PHONE_CHECK_FAILED))
            }
        }
    }

    async fn inline_answer(&self, query: &str) -> Option<OutboundResponse> {
        let query = query.trim();
        if query.is_empty() {
            return None;
        }

        let request = CompletionRequest::new(ASSISTANT_PROMPT, query, 0.7);
        match self.completion.complete(&request).await {
            Ok(body) => Some(OutboundResponse::Inline {
                id: uuid::Uuid::new_v4().to_string(),
                title: INLINE_TITLE.to_string(),
                body,
            }),
            Err(e) => {
                error!("Inline completion failed: {:#}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::{ValidationResult, UNKNOWN};
    use crate::format::SIGNATURE;
    use anyhow::Result;
    use async_trait::async_trait;
    use std::sync::Mutex;

    const OWNER: u64 = 42;
    const STRANGER: u64 = 7;

    /// Records every call; replies with canned values or fails on demand.
    #[derive(Default)]
    struct Fakes {
        completions: Mutex<Vec<CompletionRequest>>,
        images: Mutex<Vec<(String, ImageSize)>>,
        phones: Mutex<Vec<String>>,
        line_type: Option<String>,
        fail: bool,
    }

    impl Fakes {
        fn calls(&self) -> usize {
            self.completions.lock().unwrap().len()
                + self.images.lock().unwrap().len()
                + self.phones.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Completion for Fakes {
        async fn complete(&self, request: &CompletionRequest) -> Result<String> {
            self.completions.lock().unwrap().push(request.clone());
            if self.fail {
                anyhow::bail!("completion down");
            }
            Ok(format!("risposta a {}", request.user_prompt))
        }
    }

    #[async_trait]
    impl ImageGenerator for Fakes {
        async fn generate_image(&self, prompt: &str, size: ImageSize) -> Result<String> {
            self.images.lock().unwrap().push((prompt.to_string(), size));
            if self.fail {
                anyhow::bail!("images down");
            }
            Ok("https://img.example/1.png".to_string())
        }
    }

    #[async_trait]
    impl PhoneValidator for Fakes {
        async fn validate_phone(&self, number: &str) -> Result<ValidationResult> {
            self.phones.lock().unwrap().push(number.to_string());
            if self.fail {
                anyhow::bail!("timeout");
            }
            Ok(ValidationResult::new(
                Some("Italy".into()),
                None,
                self.line_type.clone(),
            ))
        }
    }

    fn router(fakes: &Arc<Fakes>) -> Router {
        Router::new(
            Principal(OWNER),
            fakes.clone(),
            fakes.clone(),
            fakes.clone(),
        )
    }

    fn command(sender_id: u64, text: &str) -> InboundEvent {
        InboundEvent::from_text(sender_id, text, None, None).unwrap()
    }

    fn plain(sender_id: u64, phone: Option<&str>) -> InboundEvent {
        InboundEvent::PlainMessage {
            sender_id,
            text: "qualsiasi".to_string(),
            sender_phone: phone.map(str::to_string),
        }
    }

    fn inline(sender_id: u64, query: &str) -> InboundEvent {
        InboundEvent::InlineQuery {
            sender_id,
            query: query.to_string(),
        }
    }

    fn text_of(reply: Option<OutboundResponse>) -> String {
        match reply {
            Some(OutboundResponse::Text { body, .. }) => body,
            other => panic!("expected text reply, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_strangers_get_nothing() {
        let fakes = Arc::new(Fakes::default());
        let router = router(&fakes);

        let events = vec![
            command(STRANGER, "/start"),
            command(STRANGER, "/chat ciao"),
            command(STRANGER, "/image gatto"),
            command(STRANGER, "/sky Masterchef"),
            command(STRANGER, "/skytoday"),
            plain(STRANGER, Some("+391234567")),
            inline(STRANGER, "ciao"),
        ];
        for event in events {
            assert_eq!(router.dispatch(event).await, None);
        }
        assert_eq!(fakes.calls(), 0);
    }

    #[tokio::test]
    async fn test_start_lists_commands() {
        let fakes = Arc::new(Fakes::default());
        let reply = router(&fakes).dispatch(command(OWNER, "/start")).await;
        let body = text_of(reply);
        assert!(body.contains("/skytoday"));
        assert_eq!(fakes.calls(), 0);
    }

    #[tokio::test]
    async fn test_chat_sends_assistant_prompt() {
        let fakes = Arc::new(Fakes::default());
        let reply = router(&fakes).dispatch(command(OWNER, "/chat ciao")).await;

        assert_eq!(
            reply,
            Some(OutboundResponse::markdown(format!(
                "risposta a ciao\n\n{}",
                SIGNATURE
            )))
        );
        let calls = fakes.completions.lock().unwrap();
        assert_eq!(
            *calls,
            vec![CompletionRequest::new(ASSISTANT_PROMPT, "ciao", 0.7)]
        );
    }

    #[tokio::test]
    async fn test_missing_arguments_give_usage_hints() {
        let fakes = Arc::new(Fakes::default());
        let router = router(&fakes);

        for (text, hint) in [
            ("/chat", USAGE_CHAT),
            ("/image ", USAGE_IMAGE),
            ("/sky    ", USAGE_SKY),
        ] {
            let reply = router.dispatch(command(OWNER, text)).await;
            assert_eq!(reply, Some(OutboundResponse::plain(hint)));
        }
        assert_eq!(fakes.calls(), 0);
    }

    #[tokio::test]
    async fn test_image_returns_unsigned_photo() {
        let fakes = Arc::new(Fakes::default());
        let reply = router(&fakes)
            .dispatch(command(OWNER, "/image un gatto"))
            .await;

        assert_eq!(
            reply,
            Some(OutboundResponse::Photo {
                url: "https://img.example/1.png".to_string()
            })
        );
        let calls = fakes.images.lock().unwrap();
        assert_eq!(
            *calls,
            vec![("un gatto".to_string(), ImageSize::SQUARE_1024)]
        );
    }

    #[tokio::test]
    async fn test_sky_commands_use_their_prompts() {
        let fakes = Arc::new(Fakes::default());
        let router = router(&fakes);

        let sky = text_of(router.dispatch(command(OWNER, "/sky X Factor")).await);
        let today = text_of(router.dispatch(command(OWNER, "/skytoday ignored")).await);

        assert_eq!(sky, format!("risposta a X Factor\n\n{}", SIGNATURE));
        assert_eq!(
            today,
            format!("risposta a {}\n\n{}", SKY_TODAY_QUESTION, SIGNATURE)
        );

        let calls = fakes.completions.lock().unwrap();
        assert_eq!(
            calls[0],
            CompletionRequest::new(SKY_PROGRAM_PROMPT, "X Factor", 0.4)
        );
        assert_eq!(
            calls[1],
            CompletionRequest::new(SKY_TODAY_PROMPT, SKY_TODAY_QUESTION, 0.3)
        );
    }

    #[tokio::test]
    async fn test_unknown_command_is_ignored() {
        let fakes = Arc::new(Fakes::default());
        let reply = router(&fakes).dispatch(command(OWNER, "/help")).await;
        assert_eq!(reply, None);
        assert_eq!(fakes.calls(), 0);
    }

    #[tokio::test]
    async fn test_upstream_failures_become_signed_errors() {
        let fakes = Arc::new(Fakes {
            fail: true,
            ..Fakes::default()
        });
        let router = router(&fakes);

        for text in ["/chat ciao", "/image gatto", "/sky X", "/skytoday"] {
            let body = text_of(router.dispatch(command(OWNER, text)).await);
            assert_eq!(body, sign(REQUEST_FAILED));
        }
    }

    #[tokio::test]
    async fn test_phone_check_flags_voip() {
        let fakes = Arc::new(Fakes {
            line_type: Some("voip".to_string()),
            ..Fakes::default()
        });
        let body = text_of(
            router(&fakes)
                .dispatch(plain(OWNER, Some("+391234567")))
                .await,
        );

        assert!(body.contains("⚠️"));
        assert!(body.contains(&format!("📞 Operatore: {}", UNKNOWN)));
        assert!(body.ends_with(&format!("\n\n{}", SIGNATURE)));
        assert_eq!(*fakes.phones.lock().unwrap(), vec!["+391234567".to_string()]);
    }

    #[tokio::test]
    async fn test_phone_check_mobile_has_no_warning() {
        let fakes = Arc::new(Fakes {
            line_type: Some("mobile".to_string()),
            ..Fakes::default()
        });
        let body = text_of(
            router(&fakes)
                .dispatch(plain(OWNER, Some("+391234567")))
                .await,
        );
        assert!(body.contains("📡 Linea: Mobile"));
        assert!(!body.contains("⚠️"));
    }

    #[tokio::test]
    async fn test_bare_slash_runs_phone_check() {
        let fakes = Arc::new(Fakes {
            line_type: Some("mobile".to_string()),
            ..Fakes::default()
        });
        let router = router(&fakes);

        for text in ["/", "/ chat ciao"] {
            let event = InboundEvent::from_text(OWNER, text, None, Some("+391234567".into()))
                .unwrap();
            let body = text_of(router.dispatch(event).await);
            assert!(body.starts_with("🔍 Analisi contatto"));
        }
        assert_eq!(fakes.phones.lock().unwrap().len(), 2);
        assert!(fakes.completions.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_phone_check_without_number() {
        let fakes = Arc::new(Fakes::default());
        let body = text_of(router(&fakes).dispatch(plain(OWNER, None)).await);
        assert_eq!(body, sign(PHONE_UNAVAILABLE));
        assert_eq!(fakes.calls(), 0);
    }

    #[tokio::test]
    async fn test_phone_check_failure_is_recovered() {
        let fakes = Arc::new(Fakes {
            fail: true,
            ..Fakes::default()
        });
        let body = text_of(
            router(&fakes)
                .dispatch(plain(OWNER, Some("+391234567")))
                .await,
        );
        assert_eq!(body, sign(PHONE_CHECK_FAILED));
    }

    #[tokio::test]
    async fn test_inline_answer_is_unsigned() {
        let fakes = Arc::new(Fakes::default());
        let reply = router(&fakes).dispatch(inline(OWNER, "meteo")).await;

        match reply {
            Some(OutboundResponse::Inline { id, title, body }) => {
                assert!(uuid::Uuid::parse_str(&id).is_ok());
                assert_eq!(title, INLINE_TITLE);
                assert_eq!(body, "risposta a meteo");
                assert!(!body.contains(SIGNATURE));
            }
            other => panic!("expected inline reply, got {:?}", other),
        }
        assert_eq!(
            *fakes.completions.lock().unwrap(),
            vec![CompletionRequest::new(ASSISTANT_PROMPT, "meteo", 0.7)]
        );
    }

    #[tokio::test]
    async fn test_empty_inline_query_produces_nothing() {
        let fakes = Arc::new(Fakes::default());
        let router = router(&fakes);
        assert_eq!(router.dispatch(inline(OWNER, "")).await, None);
        assert_eq!(router.dispatch(inline(OWNER, "   ")).await, None);
        assert_eq!(fakes.calls(), 0);
    }

    #[tokio::test]
    async fn test_failed_inline_query_produces_nothing() {
        let fakes = Arc::new(Fakes {
            fail: true,
            ..Fakes::default()
        });
        assert_eq!(router(&fakes).dispatch(inline(OWNER, "meteo")).await, None);
    }
}

//! Property tests for the negotiation state machine

#[cfg(test)]
mod tests {
    use super::super::fake_engine::Script;
    use super::super::FakeEngine;
    use crate::auth::token::{decode_token, TokenBuffer};
    use crate::auth::NtlmNegotiator;
    use crate::error::{Error, SecurityStatus};
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn negotiate_token_fits_max_token_size(
            domain in "[A-Z]{0,15}",
            user in "[a-z0-9._-]{0,20}",
            password in "\\PC{0,32}",
            max_token_size in 0u32..4096,
        ) {
            let engine = FakeEngine::new().with_max_token_size(max_token_size);
            let mut negotiator = NtlmNegotiator::new(engine);
            negotiator.initialise(&domain, &user, &password).unwrap();

            match negotiator.continue_token(None).unwrap() {
                Some(token) => {
                    let raw = decode_token(&token).unwrap();
                    prop_assert!(!raw.is_empty());
                    prop_assert!(raw.len() <= max_token_size as usize);
                }
                None => prop_assert_eq!(max_token_size, 0),
            }
            for step in negotiator.engine().steps() {
                prop_assert_eq!(step.output_capacity, max_token_size as usize);
            }
        }

        #[test]
        fn non_base64_input_never_reaches_engine(garbage in "[^A-Za-z0-9+/=\\s]{1,16}") {
            let mut negotiator = NtlmNegotiator::new(FakeEngine::new());
            negotiator.initialise("CORP", "alice", "secret").unwrap();
            negotiator.continue_token(None).unwrap();

            let result = negotiator.continue_token(Some(&garbage));
            prop_assert!(matches!(result, Err(Error::TokenDecodeError(_))));
            prop_assert_eq!(negotiator.engine().step_count(), 1);
        }

        #[test]
        fn engine_output_round_trips(written in 1usize..512) {
            let engine = FakeEngine::new()
                .with_max_token_size(512)
                .with_script(vec![Script::emit(SecurityStatus::CONTINUE_NEEDED, written)]);
            let mut negotiator = NtlmNegotiator::new(engine);
            negotiator.initialise("CORP", "alice", "secret").unwrap();

            let token = negotiator.continue_token(None).unwrap().unwrap();
            let decoded = TokenBuffer::decode(&token).unwrap();
            prop_assert_eq!(decoded.len(), written);
            prop_assert_eq!(decoded.encode_prefix(decoded.len()), Some(token));
        }
    }
}

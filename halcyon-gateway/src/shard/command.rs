use halcyon_model::{
    gateway::{
        payload::{IdentifyInfo, IdentifyProperties, OutboundPayload, ResumeInfo},
        OpCode,
    },
    Intents,
};

pub fn identify(token: &str, intents: Intents, shard_id: u64, shard_total: u64) -> OutboundPayload<IdentifyInfo> {
    OutboundPayload::new(
        OpCode::Identify,
        IdentifyInfo {
            token: token.to_owned(),
            intents,
            properties: IdentifyProperties {
                os: std::env::consts::OS.to_owned(),
                browser: "halcyon".to_owned(),
                device: "halcyon".to_owned(),
            },
            compress: false,
            large_threshold: 50,
            shard: [shard_id, shard_total],
            presence: None,
        },
    )
}

pub fn resume(token: &str, session_id: &str, seq: u64) -> OutboundPayload<ResumeInfo> {
    OutboundPayload::new(
        OpCode::Resume,
        ResumeInfo {
            token: token.to_owned(),
            session_id: session_id.to_owned(),
            seq,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::{identify, resume};
    use halcyon_model::{gateway::OpCode, Intents};

    #[test]
    fn identify_carries_the_requested_shard_and_intents() {
        let payload = identify("token", Intents::GUILDS, 3, 8);

        assert_eq!(payload.op, OpCode::Identify);
        assert_eq!(payload.d.shard, [3, 8]);
        assert_eq!(payload.d.intents, Intents::GUILDS);
        assert!(!payload.d.compress);
    }

    #[test]
    fn resume_carries_the_session_id_and_seq() {
        let payload = resume("token", "abc123", 42);

        assert_eq!(payload.op, OpCode::Resume);
        assert_eq!(payload.d.session_id, "abc123");
        assert_eq!(payload.d.seq, 42);
    }
}

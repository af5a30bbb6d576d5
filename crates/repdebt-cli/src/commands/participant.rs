use repdebt_core::{InboundEvent, QueryKind, Reply};

use super::Context;

/// Print the reply; replies that refuse the request exit non-zero.
fn respond(ctx: &Context, event: InboundEvent) -> Result<(), Box<dyn std::error::Error>> {
    match ctx.service()?.handle(event)? {
        Reply::Accepted(text) => {
            println!("{text}");
            Ok(())
        }
        Reply::Rejected(text) | Reply::NotRegistered(text) => Err(text.into()),
    }
}

pub fn register(
    ctx: &Context,
    participant_id: String,
    display_name: String,
) -> Result<(), Box<dyn std::error::Error>> {
    respond(
        ctx,
        InboundEvent::Registration {
            participant_id,
            display_name,
        },
    )
}

pub fn report(
    ctx: &Context,
    participant_id: String,
    display_name: String,
    count: i64,
) -> Result<(), Box<dyn std::error::Error>> {
    respond(
        ctx,
        InboundEvent::Report {
            participant_id,
            display_name,
            count,
        },
    )
}

pub fn stats(ctx: &Context) -> Result<(), Box<dyn std::error::Error>> {
    respond(
        ctx,
        InboundEvent::Query {
            kind: QueryKind::Roster,
            participant_id: String::new(),
        },
    )
}

pub fn me(ctx: &Context, participant_id: String) -> Result<(), Box<dyn std::error::Error>> {
    respond(
        ctx,
        InboundEvent::Query {
            kind: QueryKind::SelfStats,
            participant_id,
        },
    )
}

pub fn reset(ctx: &Context, participant_id: String) -> Result<(), Box<dyn std::error::Error>> {
    respond(
        ctx,
        InboundEvent::Query {
            kind: QueryKind::Reset,
            participant_id,
        },
    )
}

pub fn subscribe(ctx: &Context, destination_id: String) -> Result<(), Box<dyn std::error::Error>> {
    respond(ctx, InboundEvent::Subscribe { destination_id })
}

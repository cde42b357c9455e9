//! `amotion set`: send one control command.

use serde::Serialize;

use amotion_core::{Command, ControlVariables, RequestId, Session};

use crate::cli::{GlobalOpts, SetArgs};
use crate::commands::util;
use crate::error::CliError;
use crate::output;

#[derive(Serialize)]
struct Sent<'a> {
    session: &'a str,
    request_id: RequestId,
    variables: &'a ControlVariables,
}

pub async fn handle(session: &Session, args: &SetArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let variables = control_variables(args);
    let request_id = session.send_command(&Command::Control(variables.clone())).await?;
    util::wait_for_answer(session, global.timeout).await?;
    if let Some(code) = session.command_ack(request_id).await.filter(|c| !c.is_success()) {
        return Err(CliError::Rejected { code: code.to_string() });
    }

    let sent = Sent {
        session: session.name(),
        request_id,
        variables: &variables,
    };
    let out = output::render_single(
        &global.output,
        &sent,
        |s| format!("sent control #{} to {}", s.request_id, s.session),
        |s| s.request_id.to_string(),
    );
    output::print_output(&out, global.quiet);
    Ok(())
}

fn control_variables(args: &SetArgs) -> ControlVariables {
    ControlVariables {
        work_regime: args.mode,
        temp_request: args.temperature,
        fan_power_req: args.fan,
        fan_power_req_sup: args.fan_supply,
        fan_power_req_eta: args.fan_extract,
    }
}

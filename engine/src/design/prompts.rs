//! Prompt text for the first-order loop-shaping designer

/// Instruction preceding every design prompt
pub const LOOP_SHAPING_INSTRUCTION: &str = "\
You are designing a PI controller for a plant by loop shaping. \
The loop is shaped by two parameters:
- omega_L: the desired loop crossover frequency in rad/s. A higher value gives a faster \
response and a shorter settling time, but a smaller phase margin.
- beta_b: the ratio placing the PI zero below the crossover frequency (zero at omega_L * beta_b). \
A smaller value adds less phase lag at crossover, a larger value removes steady-state error faster.
Both parameters must be positive. Pick values that make the closed loop stable and satisfy \
every performance requirement.
";

/// Lead-in before the task requirement
pub const TASK_LEAD_IN: &str = "Now consider the following design task:";

/// Required answer layout
pub const RESPONSE_FORMAT: &str = "\n\n\
Respond with a JSON object only, in exactly this format:
{\"parameter\": [omega_L, beta_b]}
where omega_L and beta_b are numbers.";

/// Assemble one design prompt; `feedback` is absent on the first attempt
pub fn design_prompt(task_requirement: &str, feedback: Option<&str>) -> String {
    let mut prompt = String::with_capacity(
        LOOP_SHAPING_INSTRUCTION.len() + task_requirement.len() + RESPONSE_FORMAT.len() + 64,
    );
    prompt.push_str(LOOP_SHAPING_INSTRUCTION);
    prompt.push_str(TASK_LEAD_IN);
    prompt.push(' ');
    prompt.push_str(task_requirement.trim());
    if let Some(feedback) = feedback {
        prompt.push_str("\n\n");
        prompt.push_str(feedback);
    }
    prompt.push_str(RESPONSE_FORMAT);
    prompt
}

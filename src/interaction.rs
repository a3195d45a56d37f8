use crate::error::{RulesError, RulesResult};

use std::collections::VecDeque;
use std::fmt::Display;
use std::io::{BufRead, Write};

/// Whoever answers on behalf of the players: a terminal, a UI, a script...
///
/// Implementations may answer anything. The helpers in this module validate answers
/// and ask again until they are valid. Returning `Err` means no answer will ever come.
pub trait Interaction {
    /// Should answer one of `options`, or `""` to decline when `allow_decline` is set.
    fn choose(&mut self, prompt: &str, options: &[String], allow_decline: bool) -> RulesResult<String>;

    /// Should answer a value within `[min, max]`.
    fn choose_integer(&mut self, prompt: &str, min: i32, max: i32) -> RulesResult<i32>;
}

/// Asks until the answer is one of `options`, or a decline if allowed.
///
/// Returns the index of the chosen option, or `None` if the player declined.
pub fn choose_option(
    interaction: &mut dyn Interaction,
    prompt: &str,
    options: &[String],
    allow_decline: bool,
) -> RulesResult<Option<usize>> {
    loop {
        let answer = interaction.choose(prompt, options, allow_decline)?;
        if answer.is_empty() && allow_decline {
            return Ok(None);
        }

        match options.iter().position(|option| *option == answer) {
            Some(index) => return Ok(Some(index)),
            None => log::debug!("Invalid answer `{}` to `{}`.", answer, prompt),
        }
    }
}

/// Same as [`choose_option`], offering displayable values.
pub fn choose_from<'a, T: Display>(
    interaction: &mut dyn Interaction,
    prompt: &str,
    items: &'a [T],
    allow_decline: bool,
) -> RulesResult<Option<&'a T>> {
    let options: Vec<String> = items.iter().map(ToString::to_string).collect();
    Ok(choose_option(interaction, prompt, &options, allow_decline)?.map(|index| &items[index]))
}

/// Asks until the answer is within `[min, max]`.
pub fn choose_integer_in(
    interaction: &mut dyn Interaction,
    prompt: &str,
    min: i32,
    max: i32,
) -> RulesResult<i32> {
    loop {
        let answer = interaction.choose_integer(prompt, min, max)?;
        if (min..=max).contains(&answer) {
            return Ok(answer);
        }

        log::debug!("Answer {} to `{}` is out of [{}, {}].", answer, prompt, min, max);
    }
}

/// Line-based interaction, typically over stdin and stdout.
///
/// Options can be picked by their number or their text. An empty line declines.
pub struct ConsoleInteraction<R: BufRead, W: Write> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> ConsoleInteraction<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    fn read_line(&mut self) -> RulesResult<String> {
        let mut line = String::new();
        match self.input.read_line(&mut line) {
            Ok(0) | Err(_) => Err(RulesError::InteractionClosed),
            Ok(_) => Ok(line.trim().to_string()),
        }
    }

    fn write_prompt(&mut self, lines: &[String]) -> RulesResult<()> {
        for line in lines {
            writeln!(self.output, "{}", line).map_err(|_| RulesError::InteractionClosed)?;
        }
        self.output.flush().map_err(|_| RulesError::InteractionClosed)
    }
}

impl<R: BufRead, W: Write> Interaction for ConsoleInteraction<R, W> {
    fn choose(&mut self, prompt: &str, options: &[String], allow_decline: bool) -> RulesResult<String> {
        let mut lines = Vec::with_capacity(options.len() + 2);
        lines.push(String::from(prompt));
        lines.extend(
            options
                .iter()
                .enumerate()
                .map(|(i, option)| format!("  {}. {}", i + 1, option)),
        );
        if allow_decline {
            lines.push(String::from("  (empty line to pass)"));
        }
        self.write_prompt(&lines)?;

        loop {
            let answer = self.read_line()?;
            if answer.is_empty() && allow_decline {
                return Ok(answer);
            }

            if options.contains(&answer) {
                return Ok(answer);
            }

            if let Ok(number) = answer.parse::<usize>() {
                if (1..=options.len()).contains(&number) {
                    return Ok(options[number - 1].clone());
                }
            }

            self.write_prompt(&[String::from("Invalid choice, try again.")])?;
        }
    }

    fn choose_integer(&mut self, prompt: &str, min: i32, max: i32) -> RulesResult<i32> {
        self.write_prompt(&[format!("{} [{}-{}]", prompt, min, max)])?;

        loop {
            match self.read_line()?.parse::<i32>() {
                Ok(answer) if (min..=max).contains(&answer) => return Ok(answer),
                _ => self.write_prompt(&[format!("Enter a number between {} and {}.", min, max)])?,
            }
        }
    }
}

/// Answers from a fixed script, in order. Used for tests and replays.
///
/// Runs out with [`RulesError::InteractionClosed`].
#[derive(Debug, Default)]
pub struct ScriptedInteraction {
    answers: VecDeque<String>,
    /// Every prompt received, in order.
    prompts: Vec<String>,
}

impl ScriptedInteraction {
    pub fn new<S: Into<String>>(answers: impl IntoIterator<Item = S>) -> Self {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
            prompts: Vec::new(),
        }
    }

    /// Queues more answers after the current ones.
    pub fn push<S: Into<String>>(&mut self, answers: impl IntoIterator<Item = S>) {
        self.answers.extend(answers.into_iter().map(Into::into));
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.answers.len()
    }

    #[inline]
    pub fn prompts(&self) -> &[String] {
        &self.prompts
    }

    fn next_answer(&mut self, prompt: &str) -> RulesResult<String> {
        self.prompts.push(String::from(prompt));
        self.answers.pop_front().ok_or(RulesError::InteractionClosed)
    }
}

impl Interaction for ScriptedInteraction {
    fn choose(&mut self, prompt: &str, _options: &[String], _allow_decline: bool) -> RulesResult<String> {
        self.next_answer(prompt)
    }

    /// Answers that are not numbers are skipped, as a console would re-read them.
    fn choose_integer(&mut self, prompt: &str, _min: i32, _max: i32) -> RulesResult<i32> {
        loop {
            let answer = self.next_answer(prompt)?;
            match answer.parse() {
                Ok(answer) => return Ok(answer),
                Err(_) => log::debug!("Skipping non-numeric answer `{}`.", answer),
            }
        }
    }
}

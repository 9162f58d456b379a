use std::io::Write;

use studybuddy_core::{Effect, Notifier, SoundType, Student, StudentId};

/// Prints effects to stdout and rings the terminal bell for alerts.
#[derive(Debug, Default)]
pub struct TerminalNotifier {
    bell: bool,
}

impl TerminalNotifier {
    pub fn new(bell: bool) -> Self {
        Self { bell }
    }

    fn describe(sound: SoundType) -> &'static str {
        match sound {
            SoundType::Classic => "classic alarm",
            SoundType::Bell => "gentle bell",
            SoundType::Digital => "digital chime",
            SoundType::Buzzer => "buzzer",
            SoundType::Custom => "custom sound",
        }
    }
}

impl Notifier for TerminalNotifier {
    fn notify(&mut self, effect: &Effect) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let mut out = std::io::stdout().lock();
        match effect {
            Effect::PlayDing => writeln!(out, "*ding* study time is up")?,
            Effect::PlayAlertSound { sound, .. } => {
                if self.bell {
                    write!(out, "\x07")?;
                }
                writeln!(out, "[{}] break is over", Self::describe(*sound))?;
            }
        }
        out.flush()?;
        Ok(())
    }

    fn prompt_break_over(
        &mut self,
        student: &Student,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let mut out = std::io::stdout().lock();
        writeln!(
            out,
            "Break is over! Ready for {}'s next session? (type: next {})",
            student.name, student.id
        )?;
        out.flush()?;
        Ok(())
    }

    fn dismiss_prompt(&mut self, student_id: &StudentId) {
        tracing::debug!(student = %student_id, "prompt dismissed");
    }
}

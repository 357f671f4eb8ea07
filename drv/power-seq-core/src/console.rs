// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Console commands.
//!
//! Output goes to the board console and isn't checked: a console that
//! can't keep up loses text, it doesn't fail the command.

use core::fmt::Write;

use drv_power_seq_api::{ConsoleError, PowerState};
use ringbuf::ringbuf_entry;

use crate::hibernate::time_g3;
use crate::{ChipsetHandler, Engine, Platform, Sequencer, Trace};

/// Parses a decimal or `0x`-prefixed hex number.
fn parse_u32(arg: &str) -> Option<u32> {
    match arg.strip_prefix("0x").or_else(|| arg.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16).ok(),
        None => arg.parse().ok(),
    }
}

fn parse_bool(arg: &str) -> Option<bool> {
    const TRUE: [&str; 5] = ["on", "true", "yes", "enable", "1"];
    const FALSE: [&str; 5] = ["off", "false", "no", "disable", "0"];
    if TRUE.iter().any(|t| arg.eq_ignore_ascii_case(t)) {
        Some(true)
    } else if FALSE.iter().any(|f| arg.eq_ignore_ascii_case(f)) {
        Some(false)
    } else {
        None
    }
}

impl<P: Platform, C: ChipsetHandler> Engine<P, C> {
    /// Runs a console command. `argv[0]` is the command name.
    pub fn console_command(&mut self, argv: &[&str]) -> Result<(), ConsoleError> {
        self.sequencer().console_command(argv)
    }
}

impl<P: Platform> Sequencer<'_, P> {
    pub(crate) fn console_command(
        &mut self,
        argv: &[&str],
    ) -> Result<(), ConsoleError> {
        let config = self.core.config;
        match argv.first().copied() {
            Some("powerinfo") => {
                self.powerinfo();
                Ok(())
            }
            Some("powerindebug") => self.powerindebug(argv),
            Some("hibdelay") if config.hibernate_delay.is_some() => {
                self.hibdelay(argv)
            }
            Some("pause_in_s5") if config.pause_in_s5 => self.pause_in_s5_cmd(argv),
            _ => Err(ConsoleError::UnknownCommand),
        }
    }

    fn powerinfo(&mut self) {
        let state = self.core.state;
        let signals = self.core.signals;
        let out = self.platform.console();
        let _ = writeln!(
            out,
            "power state {} = {}, in 0x{:04x}",
            state.index(),
            state.name(),
            signals
        );
    }

    fn powerindebug(&mut self, argv: &[&str]) -> Result<(), ConsoleError> {
        if let Some(arg) = argv.get(1) {
            self.core.debug_mask = parse_u32(arg).ok_or(ConsoleError::Param1)?;
        }

        let core = &self.core;
        let out = self.platform.console();
        let _ = writeln!(out, "power in:   0x{:04x}", core.signals);
        let _ = writeln!(out, "debug mask: 0x{:04x}", core.debug_mask);
        let _ = writeln!(out, "bit meanings:");
        for (i, signal) in core.config.signals.iter().enumerate() {
            let bit = 1u32 << i;
            let _ = writeln!(
                out,
                "  0x{:04x} {} {}",
                bit,
                u32::from(core.signals & bit != 0),
                signal.name
            );
        }
        Ok(())
    }

    fn hibdelay(&mut self, argv: &[&str]) -> Result<(), ConsoleError> {
        if let Some(arg) = argv.get(1) {
            let seconds = parse_u32(arg).ok_or(ConsoleError::Param1)?;
            self.core.hibernate_delay = seconds;
            ringbuf_entry!(self.core.trace, Trace::HibernateDelay(seconds));
        }

        let now = self.platform.now();
        let on_battery_in_g3 = self.core.state == PowerState::G3
            && !self.platform.extpower_is_present();
        let delay = self.core.hibernate_delay;
        let elapsed = time_g3(self.core, now);

        let out = self.platform.console();
        let _ = writeln!(out, "Hibernation delay: {} s", delay);
        if on_battery_in_g3 {
            let _ = writeln!(out, "Time G3: {} s", elapsed);
            let _ = writeln!(out, "Time left: {} s", delay.saturating_sub(elapsed));
        }
        Ok(())
    }

    fn pause_in_s5_cmd(&mut self, argv: &[&str]) -> Result<(), ConsoleError> {
        if let Some(arg) = argv.get(1) {
            let pause = parse_bool(arg).ok_or(ConsoleError::Inval)?;
            let pause = u32::from(pause);
            self.core.pause_in_s5 = pause;
            ringbuf_entry!(self.core.trace, Trace::PauseInS5(pause));
        }

        let pause = self.core.pause_in_s5 != 0;
        let out = self.platform.console();
        let _ = writeln!(out, "pause_in_s5 = {}", if pause { "on" } else { "off" });
        Ok(())
    }
}

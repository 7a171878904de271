#![forbid(unsafe_code)]
use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use rota::{
    io,
    model::{ScheduleId, ShiftId, Staff, StaffId, StaffRole, SwapRequestId},
    scheduler::{AutoPopulate, SchedError, Scheduler, SwapAction},
    stats::DayWindow,
    storage::{JsonStorage, Storage},
    store::{MemoryStore, StaffDirectory},
    strategy::StrategyKind,
    Config,
};
#[cfg(feature = "logging")]
use tracing_subscriber::{fmt::Subscriber, EnvFilter};

/// CLI d'affectation de créneaux (fichier JSON local)
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Active les logs (feature `logging`)
    #[arg(long, global = true)]
    log: bool,

    /// Fichier JSON du roster
    #[arg(long, global = true, default_value = "roster.json")]
    roster: String,

    /// Fichier JSON de configuration (fenêtre jour, horaires par défaut)
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Ajouter un membre du personnel (affiche son id)
    AddStaff {
        #[arg(long)]
        name: String,
        #[arg(long)]
        id: Option<String>,
        /// Crée un administrateur
        #[arg(long)]
        admin: bool,
    },

    /// Importer du personnel depuis un CSV `id,name,role`
    ImportStaff {
        #[arg(long)]
        csv: String,
    },

    /// Créer un planning (affiche son id)
    CreateSchedule {
        #[arg(long)]
        admin: String,
        #[arg(long)]
        name: String,
    },

    /// Remplir un planning automatiquement
    AutoPopulate {
        #[arg(long)]
        schedule: String,
        /// even | min_days | balanced
        #[arg(long, default_value = "even")]
        strategy: String,
        /// liste "id1,id2,..." (défaut : tout le personnel)
        #[arg(long)]
        staff: Option<String>,
        #[arg(long)]
        days: Option<u32>,
        #[arg(long)]
        start_hour: Option<u32>,
        #[arg(long)]
        end_hour: Option<u32>,
        #[arg(long)]
        day_start: Option<u32>,
        #[arg(long)]
        day_end: Option<u32>,
        /// Premier jour (YYYY-MM-DD), défaut aujourd'hui (UTC)
        #[arg(long)]
        from: Option<NaiveDate>,
    },

    /// Affecter un créneau à la main
    Assign {
        #[arg(long)]
        admin: String,
        #[arg(long)]
        staff: String,
        /// RFC3339 UTC
        #[arg(long)]
        start: String,
        /// RFC3339 UTC
        #[arg(long)]
        end: String,
        #[arg(long)]
        schedule: Option<String>,
    },

    /// Pointer l'entrée
    ClockIn {
        #[arg(long)]
        staff: String,
        #[arg(long)]
        shift: String,
    },

    /// Pointer la sortie
    ClockOut {
        #[arg(long)]
        staff: String,
        #[arg(long)]
        shift: String,
    },

    /// Modifier les bornes d'un créneau non pointé
    UpdateShift {
        #[arg(long)]
        shift: String,
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        end: Option<String>,
    },

    /// Supprimer un créneau non pointé
    DeleteShift {
        #[arg(long)]
        shift: String,
    },

    /// Demander un échange de créneau
    RequestSwap {
        #[arg(long)]
        staff: String,
        #[arg(long)]
        shift: String,
        #[arg(long)]
        with: String,
        #[arg(long, default_value = "")]
        reason: String,
    },

    /// Répondre à une demande d'échange (accept | decline)
    RespondSwap {
        #[arg(long)]
        request: String,
        #[arg(long)]
        staff: String,
        #[arg(long)]
        action: String,
    },

    /// Approuver une demande d'échange (administrateur)
    ApproveSwap {
        #[arg(long)]
        admin: String,
        #[arg(long)]
        request: String,
    },

    /// Refuser une demande d'échange (administrateur)
    DenySwap {
        #[arg(long)]
        admin: String,
        #[arg(long)]
        request: String,
    },

    /// Lister et optionnellement exporter
    List {
        #[arg(long)]
        schedule: Option<String>,
        #[arg(long)]
        out_json: Option<String>,
        #[arg(long)]
        out_csv: Option<String>,
    },

    /// Rapport sur une période [from, to)
    Report {
        #[arg(long)]
        admin: String,
        /// RFC3339 UTC
        #[arg(long)]
        from: String,
        /// RFC3339 UTC
        #[arg(long)]
        to: String,
        #[arg(long)]
        staff: Option<String>,
        #[arg(long)]
        out_csv: Option<String>,
    },
}

fn parse_ts(raw: &str) -> Result<DateTime<Utc>> {
    raw.parse()
        .with_context(|| format!("invalid RFC3339 timestamp: {raw}"))
}

fn split_ids(list: &str) -> Vec<StaffId> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(StaffId::new)
        .collect()
}

fn main() {
    let cli = Cli::parse();

    #[cfg(feature = "logging")]
    if cli.log {
        let _ = Subscriber::builder()
            .with_env_filter(EnvFilter::from_default_env())
            .try_init();
    }

    let code = match run(cli) {
        Ok(code) => code,
        Err(err) => {
            match err.downcast_ref::<SchedError>() {
                Some(sched) => eprintln!("error[{}]: {sched}", sched.kind()),
                None => eprintln!("error: {err:#}"),
            }
            1
        }
    };
    std::process::exit(code);
}

fn run(cli: Cli) -> Result<i32> {
    let config = match &cli.config {
        Some(path) => Config::load_from_file(path)?,
        None => Config::default(),
    };
    let storage = JsonStorage::open(&cli.roster)?;
    let roster = storage.load_or_default()?;
    let scheduler = Scheduler::new(MemoryStore::from_roster(roster)).with_config(config);
    let save = |scheduler: &Scheduler<MemoryStore>| -> Result<()> {
        storage.save(&scheduler.store().snapshot()?)
    };

    let code = match cli.cmd {
        Commands::AddStaff { name, id, admin } => {
            let mut staff = if admin { Staff::admin(name) } else { Staff::new(name) };
            if let Some(id) = id {
                staff = staff.with_id(StaffId::new(id));
            }
            let id = staff.id.clone();
            scheduler.store().add_staff(staff)?;
            save(&scheduler)?;
            println!("{id}");
            0
        }
        Commands::ImportStaff { csv } => {
            let people = io::import_staff_csv(csv)?;
            let n = people.len();
            for p in people {
                scheduler.store().add_staff(p)?;
            }
            save(&scheduler)?;
            println!("imported {n} staff");
            0
        }
        Commands::CreateSchedule { admin, name } => {
            let schedule = scheduler.create_schedule(&StaffId::new(admin), &name)?;
            save(&scheduler)?;
            println!("{}", schedule.id);
            0
        }
        Commands::AutoPopulate {
            schedule,
            strategy,
            staff,
            days,
            start_hour,
            end_hour,
            day_start,
            day_end,
            from,
        } => {
            let strategy: StrategyKind = strategy.parse()?;
            let eligible = match staff {
                Some(list) => split_ids(&list),
                None => scheduler
                    .store()
                    .list_staff()?
                    .into_iter()
                    .filter(|p| p.role == StaffRole::Staff)
                    .map(|p| p.id)
                    .collect(),
            };
            let defaults = *scheduler.config();
            let window = DayWindow::new(
                day_start.unwrap_or(defaults.day_window.start_hour),
                day_end.unwrap_or(defaults.day_window.end_hour),
            )?;
            let mut req = AutoPopulate::from_config(&defaults, ScheduleId::new(schedule), strategy, eligible)
                .hours(
                    start_hour.unwrap_or(defaults.shift_start_hour),
                    end_hour.unwrap_or(defaults.shift_end_hour),
                )
                .day_window(window);
            if let Some(n) = days {
                req = req.days(n);
            }
            if let Some(day) = from {
                req = req.starting(day);
            }
            match scheduler.auto_populate_schedule(req) {
                Ok(outcome) => {
                    save(&scheduler)?;
                    for s in &outcome.shifts {
                        println!("{} | {} → {} | {}", s.id, s.start.to_rfc3339(), s.end.to_rfc3339(), s.staff_id);
                    }
                    println!("created {} shifts", outcome.count);
                    0
                }
                Err(SchedError::PartialPopulation {
                    shifts,
                    requested,
                    source,
                }) => {
                    save(&scheduler)?;
                    eprintln!("created {} of {requested} shifts: {source}", shifts.len());
                    // Code 2 = INCOMPLETE
                    2
                }
                Err(err) => return Err(err.into()),
            }
        }
        Commands::Assign {
            admin,
            staff,
            start,
            end,
            schedule,
        } => {
            let schedule = schedule.map(ScheduleId::new);
            let shift = scheduler.manual_assign(
                &StaffId::new(admin),
                &StaffId::new(staff),
                parse_ts(&start)?,
                parse_ts(&end)?,
                schedule.as_ref(),
            )?;
            save(&scheduler)?;
            println!("{}", shift.id);
            0
        }
        Commands::ClockIn { staff, shift } => {
            let shift = scheduler.clock_in(&StaffId::new(staff), &ShiftId::new(shift))?;
            save(&scheduler)?;
            println!("{} clocked in", shift.id);
            0
        }
        Commands::ClockOut { staff, shift } => {
            let shift = scheduler.clock_out(&StaffId::new(staff), &ShiftId::new(shift))?;
            save(&scheduler)?;
            println!("{} clocked out", shift.id);
            0
        }
        Commands::UpdateShift { shift, start, end } => {
            let start = start.as_deref().map(parse_ts).transpose()?;
            let end = end.as_deref().map(parse_ts).transpose()?;
            let shift = scheduler.update_shift(&ShiftId::new(shift), start, end)?;
            save(&scheduler)?;
            println!("{} | {} → {}", shift.id, shift.start.to_rfc3339(), shift.end.to_rfc3339());
            0
        }
        Commands::DeleteShift { shift } => {
            let ack = scheduler.delete_shift(&ShiftId::new(shift))?;
            save(&scheduler)?;
            println!("{} deleted", ack.id);
            0
        }
        Commands::RequestSwap {
            staff,
            shift,
            with,
            reason,
        } => {
            let request = scheduler.create_swap_request(
                &StaffId::new(staff),
                &ShiftId::new(shift),
                &StaffId::new(with),
                &reason,
            )?;
            save(&scheduler)?;
            println!("{}", request.id);
            0
        }
        Commands::RespondSwap {
            request,
            staff,
            action,
        } => {
            let action: SwapAction = action.parse()?;
            let request =
                scheduler.respond_to_swap(&SwapRequestId::new(request), &StaffId::new(staff), action)?;
            save(&scheduler)?;
            println!("{} {}", request.id, request.status);
            0
        }
        Commands::ApproveSwap { admin, request } => {
            let request = scheduler.approve_swap(&StaffId::new(admin), &SwapRequestId::new(request))?;
            save(&scheduler)?;
            println!("{} {}", request.id, request.status);
            0
        }
        Commands::DenySwap { admin, request } => {
            let request = scheduler.deny_swap(&StaffId::new(admin), &SwapRequestId::new(request))?;
            save(&scheduler)?;
            println!("{} {}", request.id, request.status);
            0
        }
        Commands::List {
            schedule,
            out_json,
            out_csv,
        } => {
            let roster = scheduler.store().snapshot()?;
            if let Some(path) = out_json {
                io::export_roster_json(path, &roster)?;
            }
            if let Some(path) = out_csv {
                io::export_shifts_csv(path, &roster)?;
            }
            let shifts = match schedule {
                Some(id) => {
                    let id = ScheduleId::new(id);
                    let summary = scheduler.schedule_summary(&id)?;
                    println!(
                        "{} ({}) | {} shift(s) | {:.2} h scheduled",
                        summary.schedule.name, summary.schedule.method, summary.shift_count, summary.scheduled_hours
                    );
                    scheduler.schedule_shifts(&id)?
                }
                None => {
                    let mut all = roster.shifts.clone();
                    all.sort_by_key(|s| s.start);
                    all
                }
            };
            // impression compacte
            for s in &shifts {
                let name = roster.staff_name(&s.staff_id).unwrap_or("-");
                println!(
                    "{} | {} → {} | {} | {}",
                    s.id,
                    s.start.to_rfc3339(),
                    s.end.to_rfc3339(),
                    name,
                    s.state()
                );
            }
            0
        }
        Commands::Report {
            admin,
            from,
            to,
            staff,
            out_csv,
        } => {
            let staff = staff.map(StaffId::new);
            let report = scheduler.shift_report(
                &StaffId::new(admin),
                parse_ts(&from)?,
                parse_ts(&to)?,
                staff.as_ref(),
            )?;
            for row in &report.per_staff {
                println!(
                    "{} | {} shift(s) | {:.2} h scheduled | {:.2} h worked",
                    row.staff_name, row.shifts, row.scheduled_hours, row.worked_hours
                );
            }
            println!(
                "TOTAL | {} shift(s) | {:.2} h scheduled | {:.2} h worked | {:.2} h avg",
                report.total_shifts, report.scheduled_hours, report.worked_hours, report.average_hours
            );
            if let Some(path) = out_csv {
                io::export_report_csv(path, &report)?;
            }
            0
        }
    };

    Ok(code)
}

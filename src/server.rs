use std::{fs, io::ErrorKind, os::unix::fs::FileTypeExt, path::Path, sync::Arc};

use anyhow::{Context, Result, bail};
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::{UnixListener, UnixStream},
    signal::unix::{SignalKind, signal},
    sync::mpsc,
};

use crate::{
    config::Config,
    interpreter::{EnvCredentialProvider, GeminiBackend},
    ledger::{CreditLedger, LedgerPersistence, MemoryUsageStore, UsageStore},
    payment::{ConfirmOutcome, MemoryTransactionStore, PaymentGrant},
    protocol::{ClientRequest, ErrorCategory, ServerResponse, encode_response, parse_client_request},
    referral::{MemoryProfileDirectory, MemoryReferralLog, ProfileDirectory, ReferralProcessor},
    service::InterpretationService,
};

enum ExitReason {
    SocketMessage,
    Signal(&'static str),
}

pub async fn run(config: Config) -> Result<()> {
    prepare_socket_path(&config.server.socket_path)?;
    let listener = UnixListener::bind(&config.server.socket_path).with_context(|| {
        format!(
            "unable to bind socket {}",
            config.server.socket_path.display()
        )
    })?;

    let persistence = LedgerPersistence::new(config.ledger.state_path.clone());
    let records = persistence
        .load()
        .context("failed to load ledger snapshot")?
        .unwrap_or_default();
    tracing::info!(
        target: "server",
        records = records.len(),
        state_path = %persistence.path().display(),
        "ledger_snapshot_loaded"
    );

    let usage_store = Arc::new(MemoryUsageStore::with_records(records));
    let ledger = Arc::new(
        CreditLedger::new(Arc::clone(&usage_store) as Arc<dyn UsageStore>)
            .with_write_retries(config.ledger.write_retries),
    );

    let directory = Arc::new(MemoryProfileDirectory::new());
    let referral = ReferralProcessor::new(
        Arc::clone(&directory) as Arc<dyn ProfileDirectory>,
        Arc::clone(&ledger),
        Arc::new(MemoryReferralLog::new()),
    );
    let payment = PaymentGrant::new(
        Arc::new(MemoryTransactionStore::new()),
        Arc::clone(&ledger),
        config.payment.packages.clone(),
    );
    let backend = Arc::new(
        GeminiBackend::new(&config.backend, Arc::new(EnvCredentialProvider))
            .context("failed to construct generative backend")?,
    );

    let service = Arc::new(InterpretationService::new(
        Arc::clone(&ledger),
        referral,
        payment,
        backend,
    ));

    let mut sigint =
        signal(SignalKind::interrupt()).context("unable to listen for SIGINT (Ctrl+C)")?;
    let mut sigterm = signal(SignalKind::terminate()).context("unable to listen for SIGTERM")?;
    let (exit_tx, mut exit_rx) = mpsc::unbounded_channel::<()>();

    eprintln!(
        "Oneira listening on unix socket (NDJSON): {}",
        config.server.socket_path.display()
    );

    let exit_reason = loop {
        tokio::select! {
            _ = sigint.recv() => break ExitReason::Signal("SIGINT"),
            _ = sigterm.recv() => break ExitReason::Signal("SIGTERM"),
            Some(()) = exit_rx.recv() => break ExitReason::SocketMessage,
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, _)) => {
                        let service = Arc::clone(&service);
                        let directory = Arc::clone(&directory);
                        let exit_tx = exit_tx.clone();
                        tokio::spawn(async move {
                            if let Err(err) = handle_client(stream, service, directory, exit_tx).await {
                                tracing::warn!(target: "server", error = %err, "client_handling_failed");
                            }
                        });
                    }
                    Err(err) => tracing::warn!(target: "server", error = %err, "accept_failed"),
                }
            }
        }
    };

    let records = usage_store.snapshot().await;
    persistence
        .save(&records)
        .context("failed to save ledger snapshot")?;
    tracing::info!(
        target: "server",
        records = records.len(),
        "ledger_snapshot_saved"
    );

    cleanup_socket_path(&config.server.socket_path)?;
    match exit_reason {
        ExitReason::SocketMessage => eprintln!("Oneira stopped: received exit message"),
        ExitReason::Signal(signal_name) => eprintln!("Oneira stopped: received {signal_name}"),
    }

    Ok(())
}

async fn handle_client(
    stream: UnixStream,
    service: Arc<InterpretationService>,
    directory: Arc<MemoryProfileDirectory>,
    exit_tx: mpsc::UnboundedSender<()>,
) -> Result<()> {
    let (read_half, mut write_half) = stream.into_split();
    let mut lines = BufReader::new(read_half).lines();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let request = match parse_client_request(line) {
            Ok(request) => request,
            Err(err) => {
                tracing::warn!(target: "server", error = %err, "invalid_protocol_message");
                continue;
            }
        };

        if matches!(request, ClientRequest::Exit) {
            let _ = exit_tx.send(());
            break;
        }

        // Every authenticated user becomes resolvable as a referrer.
        if let Some(user_id) = request.user_id() {
            directory.register(user_id).await;
        }

        let response = dispatch(&service, request).await;
        let mut encoded = encode_response(&response)?;
        encoded.push('\n');
        write_half.write_all(encoded.as_bytes()).await?;
    }

    Ok(())
}

async fn dispatch(service: &InterpretationService, request: ClientRequest) -> ServerResponse {
    match request {
        ClientRequest::CanInterpret { user_id } => match service.can_interpret(&user_id).await {
            Ok(allowed) => ServerResponse::CanInterpret { allowed },
            Err(err) => ServerResponse::from_error(&err),
        },
        ClientRequest::InterpretationsLeft { user_id } => {
            match service.interpretations_left(&user_id).await {
                Ok(left) => ServerResponse::InterpretationsLeft { left },
                Err(err) => ServerResponse::from_error(&err),
            }
        }
        ClientRequest::RequestInterpretation { user_id, dream_text } => {
            match service.request_interpretation(&user_id, &dream_text).await {
                Ok(outcome) => ServerResponse::Interpretation { outcome },
                Err(err) => ServerResponse::from_error(&err),
            }
        }
        ClientRequest::ApplyReferral {
            user_id,
            referral_code,
        } => match service.apply_referral(&referral_code, &user_id).await {
            Ok(grant) => ServerResponse::ReferralApplied {
                applied: grant.is_some(),
                grant,
            },
            Err(err) => ServerResponse::from_error(&err),
        },
        ClientRequest::InitiatePayment {
            user_id,
            package_id,
        } => match service.initiate_payment(&user_id, &package_id).await {
            Ok(transaction) => ServerResponse::PaymentInitiated { transaction },
            Err(err) => ServerResponse::from_error(&err),
        },
        ClientRequest::ConfirmPayment { transaction_id } => {
            match service.confirm_payment(&transaction_id).await {
                Ok(outcome) => ServerResponse::PaymentConfirmed {
                    credited: matches!(outcome, ConfirmOutcome::Credited(_)),
                },
                Err(err) => ServerResponse::from_error(&err),
            }
        }
        ClientRequest::MarkPaymentFailed { transaction_id } => {
            match service.mark_payment_failed(&transaction_id).await {
                Ok(()) => ServerResponse::PaymentMarkedFailed,
                Err(err) => ServerResponse::from_error(&err),
            }
        }
        // Exit never reaches dispatch; the connection loop intercepts it.
        ClientRequest::Exit => ServerResponse::Error {
            category: ErrorCategory::Internal,
            message: "exit is handled by the connection loop".to_string(),
        },
    }
}

fn prepare_socket_path(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("unable to create {}", parent.display()))?;
    }

    match fs::symlink_metadata(path) {
        Ok(metadata) => {
            if metadata.file_type().is_socket() || metadata.is_file() {
                fs::remove_file(path)
                    .with_context(|| format!("unable to remove stale socket {}", path.display()))?;
            } else {
                bail!(
                    "socket path exists but is not removable as file/socket: {}",
                    path.display()
                );
            }
        }
        Err(err) if err.kind() == ErrorKind::NotFound => {}
        Err(err) => {
            return Err(err).with_context(|| format!("unable to inspect {}", path.display()));
        }
    }

    Ok(())
}

fn cleanup_socket_path(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(_) => Ok(()),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err).with_context(|| format!("unable to remove {}", path.display())),
    }
}

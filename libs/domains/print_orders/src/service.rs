use axum_helpers::AuthUser;
use chrono::Utc;
use media_store::{MediaKind, MediaStore};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;
use validator::Validate;

use crate::error::{PrintOrderError, PrintOrderResult};
use crate::models::{
    AddNoteRequest, CancelPrintOrderRequest, Contact, MAX_FILES, PrintNote, PrintOrder,
    PrintOrderFilter, PrintOrderList, PrintSpecs, PrintStatus, SetFinalPriceRequest,
    StatusChange, SubmitPrintOrder, TrackQuery, UpdatePrintStatusRequest, UploadedFile,
    generate_reference,
};
use crate::pricing::{PrintQuote, quote};
use crate::repository::PrintOrderRepository;

const REFERENCE_ATTEMPTS: usize = 3;

fn validation<E: std::fmt::Display>(e: E) -> PrintOrderError {
    PrintOrderError::Validation(e.to_string())
}

pub struct PrintOrderService<R: PrintOrderRepository> {
    repository: Arc<R>,
    media: Arc<MediaStore>,
}

impl<R: PrintOrderRepository> Clone for PrintOrderService<R> {
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
            media: Arc::clone(&self.media),
        }
    }
}

impl<R: PrintOrderRepository> PrintOrderService<R> {
    pub fn new(repository: R, media: Arc<MediaStore>) -> Self {
        Self {
            repository: Arc::new(repository),
            media,
        }
    }

    /// Price a job without submitting it
    pub fn quote(&self, specs: &PrintSpecs) -> PrintOrderResult<PrintQuote> {
        specs.validate().map_err(validation)?;
        Ok(quote(specs))
    }

    /// Submit a print job with its files. Guests must supply contact
    /// details; signed-in users default to their account.
    #[instrument(skip_all, fields(files = files.len(), guest = submitter.is_none()))]
    pub async fn submit(
        &self,
        submitter: Option<&AuthUser>,
        details: SubmitPrintOrder,
        files: Vec<UploadedFile>,
    ) -> PrintOrderResult<PrintOrder> {
        details.validate().map_err(validation)?;
        if files.is_empty() || files.len() > MAX_FILES {
            return Err(PrintOrderError::Validation(format!(
                "Attach between 1 and {} files",
                MAX_FILES
            )));
        }

        let contact = match (details.contact, submitter) {
            (Some(contact), _) => contact,
            (None, Some(user)) => Contact {
                name: user.name.clone(),
                email: user.email.clone(),
                phone: None,
            },
            (None, None) => {
                return Err(PrintOrderError::Validation(
                    "Contact details are required for guest submissions".to_string(),
                ));
            }
        };

        let mut stored = Vec::with_capacity(files.len());
        for file in &files {
            stored.push(
                self.media
                    .store(MediaKind::PrintFile, &file.name, &file.bytes)
                    .await?,
            );
        }

        let now = Utc::now();
        let mut order = PrintOrder {
            id: Uuid::now_v7(),
            reference: generate_reference(now),
            user_id: submitter.map(|u| u.id),
            contact,
            files: stored,
            quote: quote(&details.specs),
            specs: details.specs,
            instructions: details.instructions.filter(|s| !s.trim().is_empty()),
            final_price: None,
            fulfillment: details.fulfillment,
            status: PrintStatus::Submitted,
            status_history: vec![StatusChange {
                status: PrintStatus::Submitted,
                note: None,
                by: None,
                at: now,
            }],
            notes: vec![],
            created_at: now,
            updated_at: now,
        };

        let mut attempt = 1;
        loop {
            match self.repository.create(order.clone()).await {
                Ok(created) => {
                    tracing::info!(
                        print_order_id = %created.id,
                        reference = %created.reference,
                        total = created.quote.total,
                        "Print order submitted"
                    );
                    return Ok(created);
                }
                Err(PrintOrderError::DuplicateReference) if attempt < REFERENCE_ATTEMPTS => {
                    attempt += 1;
                    order.reference = generate_reference(now);
                }
                Err(e) => return Err(e),
            }
        }
    }

    #[instrument(skip(self))]
    pub async fn list_mine(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: u64,
    ) -> PrintOrderResult<PrintOrderList> {
        self.list(PrintOrderFilter::for_user(user_id, limit, offset))
            .await
    }

    /// A job visible to `viewer`: their own, or any job for admins
    #[instrument(skip(self, viewer), fields(viewer = %viewer.id))]
    pub async fn get_for(&self, viewer: &AuthUser, id: Uuid) -> PrintOrderResult<PrintOrder> {
        let order = self.get(id).await?;
        if !viewer.is_admin() && !order.is_owned_by(viewer.id) {
            return Err(PrintOrderError::NotFound(id));
        }
        Ok(order)
    }

    /// Guest lookup; the email must match the contact on the job
    #[instrument(skip(self, query), fields(reference = %query.reference))]
    pub async fn track(&self, query: TrackQuery) -> PrintOrderResult<PrintOrder> {
        query.validate().map_err(validation)?;
        self.repository
            .get_by_reference(&query.reference)
            .await?
            .filter(|o| o.contact.email.eq_ignore_ascii_case(query.email.trim()))
            .ok_or(PrintOrderError::NotTracked)
    }

    #[instrument(skip(self, input))]
    pub async fn cancel_mine(
        &self,
        user_id: Uuid,
        id: Uuid,
        input: CancelPrintOrderRequest,
    ) -> PrintOrderResult<PrintOrder> {
        input.validate().map_err(validation)?;
        let order = self.get(id).await?;
        if !order.is_owned_by(user_id) {
            return Err(PrintOrderError::NotFound(id));
        }
        if !order.status.customer_cancellable() {
            return Err(PrintOrderError::InvalidTransition {
                from: order.status,
                to: PrintStatus::Cancelled,
            });
        }
        let note = input
            .reason
            .or_else(|| Some("Cancelled by customer".to_string()));
        self.change_status(order, PrintStatus::Cancelled, note, Some(user_id))
            .await
    }

    #[instrument(skip(self))]
    pub async fn list(&self, filter: PrintOrderFilter) -> PrintOrderResult<PrintOrderList> {
        let filter = filter.normalized();
        let total = self.repository.count(filter.clone()).await?;
        let (limit, offset) = (filter.limit, filter.offset);
        let data = self.repository.list(filter).await?;
        Ok(PrintOrderList {
            data,
            total,
            limit,
            offset,
        })
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: Uuid) -> PrintOrderResult<PrintOrder> {
        self.repository
            .get_by_id(id)
            .await?
            .ok_or(PrintOrderError::NotFound(id))
    }

    #[instrument(skip(self, input), fields(status = %input.status))]
    pub async fn update_status(
        &self,
        admin_id: Uuid,
        id: Uuid,
        input: UpdatePrintStatusRequest,
    ) -> PrintOrderResult<PrintOrder> {
        input.validate().map_err(validation)?;
        let order = self.get(id).await?;
        self.change_status(order, input.status, input.note, Some(admin_id))
            .await
    }

    async fn change_status(
        &self,
        mut order: PrintOrder,
        next: PrintStatus,
        note: Option<String>,
        by: Option<Uuid>,
    ) -> PrintOrderResult<PrintOrder> {
        let previous = order.status;
        if !order.transition(next, note, by) {
            return Err(PrintOrderError::InvalidTransition {
                from: previous,
                to: next,
            });
        }
        let order = self.repository.update(order, previous).await?;
        tracing::info!(print_order_id = %order.id, from = %previous, to = %next, "Print order status changed");
        Ok(order)
    }

    /// Override the quoted price after review
    #[instrument(skip(self, admin, input), fields(admin = %admin.id))]
    pub async fn set_final_price(
        &self,
        admin: &AuthUser,
        id: Uuid,
        input: SetFinalPriceRequest,
    ) -> PrintOrderResult<PrintOrder> {
        input.validate().map_err(validation)?;
        let mut order = self.get(id).await?;
        if order.status.is_terminal() {
            return Err(PrintOrderError::Closed(order.status));
        }

        let now = Utc::now();
        let body = match input.note {
            Some(note) => format!("Final price set to {}: {}", cents(input.final_price), note),
            None => format!("Final price set to {}", cents(input.final_price)),
        };
        order.final_price = Some(input.final_price);
        order.notes.push(PrintNote {
            author_id: admin.id,
            author_name: admin.name.clone(),
            body,
            at: now,
        });
        order.updated_at = now;

        let status = order.status;
        let order = self.repository.update(order, status).await?;
        tracing::info!(print_order_id = %order.id, final_price = input.final_price, "Final price set");
        Ok(order)
    }

    /// Append an internal staff note
    #[instrument(skip(self, admin, input), fields(admin = %admin.id))]
    pub async fn add_note(
        &self,
        admin: &AuthUser,
        id: Uuid,
        input: AddNoteRequest,
    ) -> PrintOrderResult<PrintOrder> {
        input.validate().map_err(validation)?;
        let mut order = self.get(id).await?;
        let now = Utc::now();
        order.notes.push(PrintNote {
            author_id: admin.id,
            author_name: admin.name.clone(),
            body: input.body.trim().to_string(),
            at: now,
        });
        order.updated_at = now;

        let status = order.status;
        self.repository.update(order, status).await
    }
}

fn cents(amount: i64) -> String {
    format!("{}.{:02}", amount / 100, amount % 100)
}
